//! Re-visiting known cases by number on the case search page.

use crate::error::ScrapeError;
use crate::models::CaseRow;
use crate::scraper::detail::extract_row;
use crate::scraper::parsers::find_summary_field;
use crate::scraper::selectors::{CASE_NUMBER, CASE_SEARCH_SUBMIT, SUMMARY_TABLE};
use crate::scraper::{Browser, BrowserLauncher};
use tracing::{error, info, warn};

use super::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupMode {
    /// Only the case number and its current disposition.
    #[default]
    DispositionOnly,
    /// Every summary and party field, same columns as a date-range scrape.
    Full,
}

#[derive(Debug, Default)]
pub struct LookupReport {
    pub rows: Vec<CaseRow>,
    pub failed_cases: Vec<String>,
    pub restarts: usize,
    /// Case number the lookup stopped at, with the reason.
    pub aborted: Option<(String, String)>,
}

impl<L: BrowserLauncher> Pipeline<L> {
    /// Look up each case number in turn. Fails only when no browser could be
    /// started.
    pub async fn lookup(&mut self, case_ids: &[String], mode: LookupMode) -> Result<LookupReport, ScrapeError> {
        info!("=== Looking up {} cases ({:?}) ===", case_ids.len(), mode);
        self.session.start().await?;

        let mut report = LookupReport::default();

        for (i, id) in case_ids.iter().enumerate() {
            let looked_up = match self.lookup_case(id, mode).await {
                Err(e) if e.is_timeout() => {
                    warn!("Case {}: {}. Restarting browser and retrying once", id, e);
                    report.restarts += 1;
                    match self.session.restart().await.map(|_| ()) {
                        Ok(()) => self.lookup_case(id, mode).await,
                        Err(e) => Err(e),
                    }
                }
                other => other,
            };

            match looked_up {
                Ok(row) => report.rows.push(row),
                Err(ScrapeError::MalformedRecord { row, .. }) => {
                    warn!("Skipping case {}: unparsable summary row {:?}", id, row);
                    report.failed_cases.push(id.clone());
                }
                Err(e) => {
                    error!(
                        "Stopping lookup at case {} ({}). {} cases not attempted",
                        id,
                        e,
                        case_ids.len() - i - 1
                    );
                    report.aborted = Some((id.clone(), e.to_string()));
                    break;
                }
            }

            if (i + 1) % 25 == 0 {
                info!("Looked up {}/{} cases", i + 1, case_ids.len());
            }
        }

        self.session.stop().await;
        info!(
            "=== Done: {} rows | {} unparsable cases | {} restarts ===",
            report.rows.len(),
            report.failed_cases.len(),
            report.restarts
        );
        Ok(report)
    }

    async fn lookup_case(&mut self, id: &str, mode: LookupMode) -> Result<CaseRow, ScrapeError> {
        let url = self.config.site.case_search_url.clone();
        let wait = self.explicit_wait();

        let browser = self.session.browser()?;
        browser.goto(&url).await?;
        browser.fill(CASE_NUMBER, id).await?;
        browser.click(CASE_SEARCH_SUBMIT, wait).await?;

        let id_only = CaseRow {
            case_id: Some(id.to_string()),
            ..Default::default()
        };

        match browser.wait_for(SUMMARY_TABLE, wait).await {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                info!("Case {} has no summary page, keeping only its number", id);
                return Ok(id_only);
            }
            Err(e) => return Err(e),
        }

        let row = match mode {
            LookupMode::DispositionOnly => {
                let html = browser.page_source().await?;
                CaseRow {
                    disposition: find_summary_field(&html, "DISPOSITION").filter(|d| !d.is_empty()),
                    ..id_only
                }
            }
            LookupMode::Full => {
                let mut row = extract_row(browser, wait).await?;
                row.case_id.get_or_insert_with(|| id.to_string());
                row
            }
        };

        self.pause_between_cases().await;
        Ok(row)
    }
}
