//! Filling and submitting the listing-by-classification search form.

use crate::error::ScrapeError;
use crate::models::DateRange;
use chrono::Days;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::selectors::{
    BEGIN_DATE, CLASSIFICATION, END_DATE, RANGE_TOO_WIDE_ALERT, SEARCH_SUBMIT,
};
use super::{Browser, Result};

/// Knobs the form driver needs from the run configuration.
#[derive(Debug, Clone)]
pub struct SearchForm {
    pub classification_code: String,
    pub explicit_wait: Duration,
    pub alert_wait: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Range the results page actually lists.
    pub submitted: DateRange,
    /// Day cut off the front after a "range too wide" alert; still to be
    /// scraped on its own.
    pub split_off: Option<DateRange>,
    /// Alert text the driver did not recognise. The form was not resubmitted.
    pub unexpected_alert: Option<String>,
}

/// Submit the search for `range`. On the site's range-too-wide alert the
/// first day is split off and the remainder is resubmitted once.
pub async fn submit_search<B: Browser>(
    browser: &mut B,
    form: &SearchForm,
    range: DateRange,
) -> Result<SearchOutcome> {
    browser
        .select_by_value(CLASSIFICATION, &form.classification_code)
        .await?;
    browser.fill(BEGIN_DATE, &range.form_start()).await?;
    browser.fill(END_DATE, &range.form_end()).await?;
    browser.click(SEARCH_SUBMIT, form.explicit_wait).await?;

    let mut outcome = SearchOutcome {
        submitted: range,
        split_off: None,
        unexpected_alert: None,
    };

    let Some(text) = browser.alert_text(form.alert_wait).await? else {
        return Ok(outcome);
    };

    if !text.contains(RANGE_TOO_WIDE_ALERT) {
        let alert = ScrapeError::UnexpectedAlert(text.clone());
        warn!("{} after searching {}. Continuing without resubmitting", alert, range);
        // An open alert fails every later WebDriver command.
        if let Err(e) = browser.accept_alert().await {
            debug!("Alert already gone: {}", e);
        }
        outcome.unexpected_alert = Some(text);
        return Ok(outcome);
    }

    info!(
        "Site rejected {} ({} days) as too wide, splitting off {}",
        range,
        range.span_days(),
        range.form_start()
    );
    browser.accept_alert().await?;

    let next_start = range
        .start
        .checked_add_days(Days::new(1))
        .filter(|d| *d <= range.end)
        .ok_or_else(|| ScrapeError::RangeRejected(range.to_string()))?;
    let adjusted = DateRange::new(next_start, range.end);

    browser.fill(BEGIN_DATE, &adjusted.form_start()).await?;
    browser.click(SEARCH_SUBMIT, form.explicit_wait).await?;

    if let Some(again) = browser.alert_text(form.alert_wait).await? {
        debug!("Alert after resubmitting {}: {:?}", adjusted, again);
        if again.contains(RANGE_TOO_WIDE_ALERT) {
            browser.accept_alert().await?;
        }
        return Err(ScrapeError::RangeRejected(adjusted.to_string()));
    }

    outcome.submitted = adjusted;
    outcome.split_off = Some(DateRange::single_day(range.start));
    Ok(outcome)
}
