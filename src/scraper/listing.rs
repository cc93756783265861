//! Enumerating the case actions on a results page.

use std::time::Duration;
use tracing::{debug, info};

use super::selectors::{CASE_ACTIONS, SHOW_ALL_ROWS};
use super::{Browser, Result};

/// Expand the listing to a single page, then return the "open case" action
/// of every row in page order.
///
/// The show-all control only exists when there are enough rows to paginate,
/// so not finding it is expected and only logged.
pub async fn list_cases<B: Browser>(browser: &mut B, wait: Duration) -> Result<Vec<B::Element>> {
    match browser.click(SHOW_ALL_ROWS, wait).await {
        Ok(()) => debug!("Expanded results to show all rows"),
        Err(e) if e.is_timeout() => {
            info!("No \"show all rows\" control; the range probably has few or no filings");
        }
        Err(e) => return Err(e),
    }

    let actions = browser.find_all(CASE_ACTIONS).await?;
    info!("Found {} case records", actions.len());
    Ok(actions)
}
