//! Error kinds raised while driving the court-records site.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("navigation timed out: {0}")]
    NavigationTimeout(String),

    #[error("malformed record for case {}: {row:?}", case_id.as_deref().unwrap_or("<unknown>"))]
    MalformedRecord { case_id: Option<String>, row: String },

    #[error("unexpected alert: {0}")]
    UnexpectedAlert(String),

    #[error("site rejected date range {0}")]
    RangeRejected(String),

    #[error("browser session could not be started: {0}")]
    Session(String),

    #[error("browser failure: {0}")]
    UnknownFailure(String),
}

impl ScrapeError {
    /// Timeouts are the only failures the orchestrator recovers from by
    /// restarting the browser session.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScrapeError::NavigationTimeout(_))
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("case {case_id}: unparsable filed date {value:?}")]
    InvalidFiledDate { case_id: String, value: String },
}
