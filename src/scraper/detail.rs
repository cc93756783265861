//! Case detail pages: opening them in their own tab and reading both tables.

use crate::error::ScrapeError;
use crate::models::{CaseRow, PartyInfo, RawCaseRecord};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::parsers::parse_case_page;
use super::selectors::{PARTIES_BUTTON, PARTY_TABLE};
use super::{Browser, Result};

const TAB_POLL: Duration = Duration::from_millis(100);

/// A case detail tab opened from the results tab.
///
/// Holding one means focus is on the detail tab. It has to be handed back
/// through [`DetailTab::close`], which closes the tab and refocuses the
/// results tab, whether or not extraction succeeded.
#[must_use = "a detail tab must be closed to give focus back to the results"]
pub struct DetailTab<W> {
    results: W,
    closed: bool,
}

impl<W: Clone + PartialEq + std::fmt::Debug + Send + Sync> DetailTab<W> {
    /// Click a case action and move focus to the tab it opens.
    pub async fn open<B>(browser: &mut B, action: &B::Element, wait: Duration) -> Result<Self>
    where
        B: Browser<Window = W>,
    {
        let results = browser.current_window().await?;
        browser.click_element(action, wait).await?;

        let deadline = Instant::now() + wait;
        let detail = loop {
            let windows = browser.windows().await?;
            if let Some(w) = windows.into_iter().find(|w| *w != results) {
                break w;
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::NavigationTimeout(
                    "case detail tab never opened".into(),
                ));
            }
            sleep(TAB_POLL).await;
        };

        browser.switch_to_window(detail).await?;
        Ok(Self { results, closed: false })
    }

    pub async fn close<B>(mut self, browser: &mut B) -> Result<()>
    where
        B: Browser<Window = W>,
    {
        self.closed = true;
        browser.close_window().await?;
        browser.switch_to_window(self.results.clone()).await
    }
}

impl<W> Drop for DetailTab<W> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Detail tab dropped without being closed; browser focus is stale");
        }
    }
}

/// Read one case from the page that currently has focus: open the parties
/// view, then parse the summary and party tables.
pub async fn extract_case<B: Browser>(
    browser: &mut B,
    wait: Duration,
) -> Result<(RawCaseRecord, PartyInfo)> {
    browser.click(PARTIES_BUTTON, wait).await?;

    // Cases without parties never render the table; parse what is there.
    match browser.wait_for(PARTY_TABLE, wait).await {
        Ok(()) => {}
        Err(e) if e.is_timeout() => debug!("Party table did not appear: {}", e),
        Err(e) => return Err(e),
    }

    let html = browser.page_source().await?;
    parse_case_page(&html)
}

/// Extract and fold into a row in one step.
pub async fn extract_row<B: Browser>(browser: &mut B, wait: Duration) -> Result<CaseRow> {
    let (summary, parties) = extract_case(browser, wait).await?;
    Ok(CaseRow::from_scraped(&summary, parties))
}
