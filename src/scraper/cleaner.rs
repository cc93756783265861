use crate::error::NormalizeError;
use crate::models::{CaseRow, EvictionCase, FORM_DATE_FORMAT};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, info};

const DISPOSITION_SEPARATOR: &str = " - ";

// ── Field parsers ─────────────────────────────────────────────────────────────

/// Parse an amount as a plain number and round it.
/// "500" → 500 | "499.6" → 500 | "1,234" → None | "abc" → None
pub fn parse_amount(s: &str) -> Option<i64> {
    let value: f64 = s.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

/// Dates as the clerk's pages print them ("01/02/2020"), or ISO.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, FORM_DATE_FORMAT) {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }

    None
}

/// "01/02/2020 - DISMISSED" → (2020-01-02, "DISMISSED").
/// Text without a leading date stays whole and gets no date.
pub fn split_disposition(s: &str) -> (Option<NaiveDate>, Option<String>) {
    if let Some((head, tail)) = s.split_once(DISPOSITION_SEPARATOR) {
        if let Some(date) = parse_date(head) {
            let tail = tail.trim();
            let text = if tail.is_empty() { None } else { Some(tail.to_string()) };
            return (Some(date), text);
        }
    }
    (None, Some(s.to_string()))
}

fn blank_to_none(value: &mut Option<String>) {
    if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        *value = None;
    }
}

// ── Rows → cases ──────────────────────────────────────────────────────────────

/// Turn the rows a run collected into output records.
///
/// Exact duplicates and rows without a case number are dropped first, blank
/// strings become nulls, then amounts, filed dates and dispositions are
/// typed. Every record is stamped with `run_date`. When a case number occurs
/// more than once only its first row is kept. An unparsable filed date fails
/// the whole pass.
pub fn normalize(rows: Vec<CaseRow>, run_date: NaiveDate) -> Result<Vec<EvictionCase>, NormalizeError> {
    let total = rows.len();

    let mut seen = HashSet::new();
    let mut rows: Vec<CaseRow> = rows.into_iter().filter(|r| seen.insert(r.clone())).collect();
    let duplicates = total - rows.len();

    rows.retain(|r| r.case_id.is_some());

    for row in &mut rows {
        for column in row.columns_mut() {
            blank_to_none(column);
        }
    }
    // A case number that was only whitespace is as good as none.
    rows.retain(|r| r.case_id.is_some());

    let any_disposition = rows.iter().any(|r| r.disposition.is_some());

    let mut ids = HashSet::new();
    let mut cases = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(case_id) = row.case_id else { continue };
        if !ids.insert(case_id.clone()) {
            debug!("Dropping repeated row for case {}", case_id);
            continue;
        }

        let filed_date = match row.filed_date.as_deref() {
            Some(raw) => Some(parse_date(raw).ok_or_else(|| NormalizeError::InvalidFiledDate {
                case_id: case_id.clone(),
                value: raw.to_string(),
            })?),
            None => None,
        };

        let (disposition_date, disposition) = match row.disposition.as_deref() {
            Some(raw) if any_disposition => split_disposition(raw),
            _ => (None, None),
        };

        cases.push(EvictionCase {
            case_id,
            court: row.court,
            case_caption: row.case_caption,
            judge: row.judge,
            filed_date,
            case_type: row.case_type,
            amount: row.amount.as_deref().and_then(parse_amount),
            disposition,
            disposition_date,
            plaintiff_name: row.plaintiff_name,
            plaintiff_address: row.plaintiff_address,
            plaintiff_attorney: row.plaintiff_attorney,
            defendant_name: row.defendant_name,
            defendant_address: row.defendant_address,
            defendant_attorney: row.defendant_attorney,
            last_updated: run_date,
        });
    }

    info!(
        "Normalized {} rows into {} cases ({} exact duplicates)",
        total,
        cases.len(),
        duplicates
    );
    Ok(cases)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
