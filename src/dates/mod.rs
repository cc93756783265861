//! Splitting a requested span into search-form sized date ranges.

use crate::error::ScrapeError;
use crate::models::DateRange;
use chrono::{Days, Local, NaiveDate};

/// Longest span (end - start, in days) the search form accepts.
pub const DEFAULT_MAX_SPAN_DAYS: u64 = 7;

/// Parse a command-line date in `mmddyyyy` form.
pub fn parse_mmddyyyy(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%m%d%Y")
        .map_err(|e| format!("expected a date as mmddyyyy, got {s:?}: {e}"))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Break `[start, end]` into consecutive ranges with `end - start <= max_span`.
///
/// Each step takes `[cursor, cursor + max_span]`; the last range is clipped to
/// `end`. Fails before anything is produced when `start > end` or `end` lies in
/// the future.
pub fn partition(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    max_span: u64,
) -> Result<Vec<DateRange>, ScrapeError> {
    if start > end {
        return Err(ScrapeError::InvalidDateRange(format!(
            "start date {start} is after end date {end}"
        )));
    }
    if end > today {
        return Err(ScrapeError::InvalidDateRange(format!(
            "end date {end} is after today ({today})"
        )));
    }

    let mut ranges = Vec::new();
    let mut cursor = start;

    loop {
        let window_end = cursor
            .checked_add_days(Days::new(max_span))
            .unwrap_or(NaiveDate::MAX);

        if window_end >= end {
            ranges.push(DateRange::new(cursor, end));
            break;
        }

        ranges.push(DateRange::new(cursor, window_end));
        cursor = window_end + Days::new(1);
    }

    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn as_form(ranges: &[DateRange]) -> Vec<[String; 2]> {
        ranges.iter().map(|r| [r.form_start(), r.form_end()]).collect()
    }

    #[test]
    fn test_partition_example() {
        let ranges = partition(d(1, 1, 2020), d(1, 17, 2020), d(6, 1, 2024), 7).unwrap();
        assert_eq!(
            as_form(&ranges),
            vec![
                ["01/01/2020".to_string(), "01/08/2020".to_string()],
                ["01/09/2020".to_string(), "01/16/2020".to_string()],
                ["01/17/2020".to_string(), "01/17/2020".to_string()],
            ]
        );
    }

    #[test]
    fn test_partition_single_day_and_exact_window() {
        let today = d(6, 1, 2024);
        let one = partition(d(3, 5, 2021), d(3, 5, 2021), today, 7).unwrap();
        assert_eq!(one, vec![DateRange::single_day(d(3, 5, 2021))]);

        let exact = partition(d(3, 1, 2021), d(3, 8, 2021), today, 7).unwrap();
        assert_eq!(exact, vec![DateRange::new(d(3, 1, 2021), d(3, 8, 2021))]);
    }

    #[test]
    fn test_partition_covers_span_without_gaps() {
        let today = d(12, 31, 2023);
        let start = d(1, 1, 2023);
        for len in 0..60u64 {
            let end = start + Days::new(len);
            let ranges = partition(start, end, today, 7).unwrap();

            assert_eq!(ranges.first().unwrap().start, start);
            assert_eq!(ranges.last().unwrap().end, end);
            for r in &ranges {
                assert!(r.start <= r.end);
                assert!(r.span_days() <= 7);
            }
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end + Days::new(1), pair[1].start);
            }
        }
    }

    #[test]
    fn test_partition_rejects_bad_bounds() {
        let today = d(6, 1, 2024);
        let err = partition(d(1, 10, 2020), d(1, 1, 2020), today, 7).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidDateRange(_)));

        let err = partition(d(5, 1, 2024), d(6, 2, 2024), today, 7).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidDateRange(_)));

        assert!(partition(d(5, 1, 2024), today, today, 7).is_ok());
    }

    #[test]
    fn test_parse_mmddyyyy() {
        assert_eq!(parse_mmddyyyy("01172020"), Ok(d(1, 17, 2020)));
        assert!(parse_mmddyyyy("2020-01-17").is_err());
        assert!(parse_mmddyyyy("13012020").is_err());
    }
}
