//! Run orchestrator: date ranges → search → listing → detail pages → rows.
//!
//! ## Run modes
//!
//! `run()`: scrape every filing between two dates:
//!   1. Split the span into ranges the search form accepts
//!   2. For each range: submit the search, list the cases, read every detail
//!      tab, merge the range's rows into the run
//!   A navigation timeout gets one browser restart and one retry of the range.
//!   Any further failure stops the run; rows merged so far are kept.
//!
//! `lookup()`: re-visit known case numbers (see `lookup.rs`), e.g. the cases
//!   a previous run could not parse.

mod lookup;

pub use lookup::{LookupMode, LookupReport};

use crate::config::AppConfig;
use crate::dates::partition;
use crate::error::ScrapeError;
use crate::models::{CaseRow, DateRange, RangeBuffer, ScrapeRunState};
use crate::scraper::detail::{DetailTab, extract_row};
use crate::scraper::listing::list_cases;
use crate::scraper::search::{SearchForm, submit_search};
use crate::scraper::session::SessionManager;
use crate::scraper::{Browser, BrowserLauncher};
use crate::utils::polite_pause;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Where a single date range is in its pass through the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeState {
    Pending,
    Submitted,
    Listed,
    Scraping,
    Merged,
    Failed,
}

impl fmt::Display for RangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RangeState::Pending => "PENDING",
            RangeState::Submitted => "SUBMITTED",
            RangeState::Listed => "LISTED",
            RangeState::Scraping => "SCRAPING",
            RangeState::Merged => "MERGED",
            RangeState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeFailure {
    pub range: DateRange,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Scraped rows in arrival order, including empty slots of skipped cases.
    pub rows: Vec<CaseRow>,
    /// Case numbers whose detail page could not be parsed.
    pub failed_cases: Vec<String>,
    /// Unparsable detail pages that showed no case number.
    pub unidentified_cases: usize,
    pub completed: Vec<DateRange>,
    pub restarts: usize,
    /// Set when the run stopped before its queue was empty.
    pub aborted: Option<RangeFailure>,
}

/// A fully scraped range, not yet merged.
struct ScrapedRange {
    buffer: RangeBuffer,
    split_off: Option<DateRange>,
}

pub struct Pipeline<L: BrowserLauncher> {
    config: AppConfig,
    session: SessionManager<L>,
}

impl<L: BrowserLauncher> Pipeline<L> {
    pub fn new(config: AppConfig, launcher: L) -> Self {
        Self {
            config,
            session: SessionManager::new(launcher),
        }
    }

    fn search_form(&self) -> SearchForm {
        SearchForm {
            classification_code: self.config.site.classification_code.clone(),
            explicit_wait: self.config.browser.explicit_wait(),
            alert_wait: self.config.browser.alert_wait(),
        }
    }

    fn explicit_wait(&self) -> Duration {
        self.config.browser.explicit_wait()
    }

    async fn pause_between_cases(&self) {
        polite_pause(self.config.browser.case_pause_ms, self.config.browser.jitter_ms).await;
    }

    /// Scrape every filing between `start` and `end` (inclusive).
    ///
    /// Fails only when nothing could be attempted: bad dates, no browser, or
    /// an unreachable search page. Anything later ends up in the report.
    pub async fn run(&mut self, start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<RunReport, ScrapeError> {
        let ranges = partition(start, end, today, self.config.run.max_span_days)?;
        info!(
            "=== Scraping {} → {} in {} date ranges ===",
            start,
            end,
            ranges.len()
        );

        let opened = self.open_search_page().await;
        let report = match opened {
            Ok(()) => Ok(self.run_ranges(ranges).await),
            Err(e) => Err(e),
        };
        self.session.stop().await;

        if let Ok(report) = &report {
            info!(
                "=== Done: {} ranges | {} rows | {} unparsable cases | {} browser sessions ===",
                report.completed.len(),
                report.rows.len(),
                report.failed_cases.len() + report.unidentified_cases,
                self.session.launches()
            );
        }
        report
    }

    async fn run_ranges(&mut self, ranges: Vec<DateRange>) -> RunReport {
        let mut queue: VecDeque<DateRange> = ranges.into();
        let mut state = ScrapeRunState::default();
        let mut report = RunReport::default();

        while let Some(range) = queue.pop_front() {
            let scraped = match self.scrape_range(range).await {
                Err(e) if e.is_timeout() => {
                    warn!("{}: {}. Restarting browser and retrying the range once", range, e);
                    report.restarts += 1;
                    match self.reopen_search_page().await {
                        Ok(()) => self.scrape_range(range).await,
                        Err(e) => Err(e),
                    }
                }
                other => other,
            };

            let scraped = match scraped {
                Ok(scraped) => scraped,
                Err(e) => {
                    debug!("{}: {}", range, RangeState::Failed);
                    error!(
                        "Stopping run at {} ({}). {} ranges not attempted; rows scraped before {} are kept",
                        range,
                        e,
                        queue.len(),
                        range.form_start()
                    );
                    report.aborted = Some(RangeFailure { range, error: e.to_string() });
                    break;
                }
            };

            let n = scraped.buffer.len();
            state.merge(scraped.buffer);
            if let Some(day) = scraped.split_off {
                info!("Queued {} to be scraped on its own", day);
                queue.push_back(day);
            }
            report.completed.push(range);
            debug!("{}: {}", range, RangeState::Merged);
            info!("Finished scraping {} ({} records)", range, n);

            if let Err(e) = self.reset_search_page().await {
                warn!("Could not return to the search page after {}: {}", range, e);
                report.restarts += 1;
                if let Err(e) = self.reopen_search_page().await {
                    error!("Browser could not be recovered: {}", e);
                    if let Some(next) = queue.front() {
                        report.aborted = Some(RangeFailure { range: *next, error: e.to_string() });
                    }
                    break;
                }
            }
        }

        report.rows = state.rows;
        report.failed_cases = state.failed_cases;
        report.unidentified_cases = state.unidentified_cases;
        report
    }

    /// One pass over a range, from form submission to a filled buffer. The
    /// browser must be on the search page.
    async fn scrape_range(&mut self, range: DateRange) -> Result<ScrapedRange, ScrapeError> {
        let form = self.search_form();
        let wait = self.explicit_wait();
        debug!("{}: {}", range, RangeState::Pending);

        let search = {
            let browser = self.session.browser()?;
            submit_search(browser, &form, range).await?
        };
        debug!("{}: {} as {}", range, RangeState::Submitted, search.submitted);

        let actions = list_cases(self.session.browser()?, wait).await?;
        debug!("{}: {} ({} cases)", range, RangeState::Listed, actions.len());

        let mut buffer = RangeBuffer::with_slots(actions.len());
        debug!("{}: {}", range, RangeState::Scraping);

        for (i, action) in actions.iter().enumerate() {
            let browser = self.session.browser()?;
            let tab = DetailTab::open(browser, action, wait).await?;
            let extracted = extract_row(browser, wait).await;
            self.pause_between_cases().await;
            tab.close(self.session.browser()?).await?;

            match extracted {
                Ok(row) => buffer.fill(i, row),
                Err(ScrapeError::MalformedRecord { case_id: Some(id), row }) => {
                    warn!("Skipping case {}: unparsable summary row {:?}", id, row);
                    buffer.mark_failed(id);
                }
                // Nothing to look up later, so it stays out of the failed list.
                Err(ScrapeError::MalformedRecord { case_id: None, row }) => {
                    warn!(
                        "Skipping row {} of {}: no case number shown, unparsable summary row {:?}",
                        i + 1,
                        range,
                        row
                    );
                    buffer.mark_unidentified();
                }
                Err(e) => return Err(e),
            }
        }

        if buffer.skipped() > 0 {
            warn!("{}: {} of {} cases unparsable", range, buffer.skipped(), buffer.len());
        }

        Ok(ScrapedRange {
            buffer,
            split_off: search.split_off,
        })
    }

    async fn open_search_page(&mut self) -> Result<(), ScrapeError> {
        let url = self.config.site.search_url.clone();
        self.session.start().await?.goto(&url).await
    }

    async fn reopen_search_page(&mut self) -> Result<(), ScrapeError> {
        let url = self.config.site.search_url.clone();
        self.session.restart().await?.goto(&url).await
    }

    /// Back to the form with a clean cookie jar, so the next query does not
    /// inherit state from this one. Loads the form afresh: after an alert the
    /// browser may be on the form or on a results page.
    async fn reset_search_page(&mut self) -> Result<(), ScrapeError> {
        let url = self.config.site.search_url.clone();
        let browser = self.session.browser()?;
        browser.goto(&url).await?;
        browser.delete_all_cookies().await
    }
}
