pub mod cleaner;
pub mod detail;
pub mod driver;
pub mod listing;
pub mod parsers;
pub mod search;
pub mod session;

#[cfg(test)]
pub mod fake;

use crate::error::ScrapeError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

// ── Locators ──────────────────────────────────────────────────────────────────

/// How an element on the court site is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum By {
    /// Form control by its `name` attribute.
    Name(&'static str),
    XPath(&'static str),
    Css(&'static str),
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            By::Name(n) => write!(f, "name={}", n),
            By::XPath(x) => write!(f, "xpath={}", x),
            By::Css(c) => write!(f, "css={}", c),
        }
    }
}

/// Page structure of the clerk's site. Everything that breaks when the site
/// is redesigned lives here.
pub mod selectors {
    use super::By;

    // Listing-by-classification search form
    pub const CLASSIFICATION: By = By::Name("ccode");
    pub const BEGIN_DATE: By = By::Name("begdate");
    pub const END_DATE: By = By::Name("enddate");
    pub const SEARCH_SUBMIT: By = By::XPath(r#"//*[@id="cc_frm"]/input[3]"#);

    // Results listing
    pub const SHOW_ALL_ROWS: By = By::XPath("/html/body/div[1]/div[3]/button");
    pub const CASE_ACTIONS: By = By::XPath("//td[5]/form");

    // Case detail page
    pub const PARTIES_BUTTON: By =
        By::XPath("/html/body/div[1]/table/tbody/tr[1]/td[2]/form[4]/input[3]");
    pub const PARTY_TABLE: By = By::Css("#party_info_table");
    pub const SUMMARY_TABLE: By = By::Css("#case_summary_table");

    // Case-number search
    pub const CASE_NUMBER: By = By::Name("casenumber");
    pub const CASE_SEARCH_SUBMIT: By = By::XPath(r#"//*[@id="cc_frm"]/p/input[3]"#);

    /// Alert text the search form raises for spans the server refuses.
    pub const RANGE_TOO_WIDE_ALERT: &str = "Date range cannot be greater than 7 days";
}

// ── Browser abstraction ───────────────────────────────────────────────────────

/// One automated browser session, exclusively owned by whoever holds `&mut`.
///
/// `click` and `wait_for` wait up to the given budget and fail with
/// `ScrapeError::NavigationTimeout` when the element never shows up. Lookups
/// through `find_all` only honour the session's implicit wait.
#[async_trait]
pub trait Browser: Send {
    /// Handle to an element found on the current page.
    type Element: Send + Sync;
    /// Handle to a browser tab.
    type Window: Clone + PartialEq + fmt::Debug + Send + Sync;

    async fn goto(&mut self, url: &str) -> Result<()>;

    async fn select_by_value(&mut self, by: By, value: &str) -> Result<()>;
    /// Clear a text input and type `text` into it.
    async fn fill(&mut self, by: By, text: &str) -> Result<()>;
    async fn click(&mut self, by: By, within: Duration) -> Result<()>;
    async fn wait_for(&mut self, by: By, within: Duration) -> Result<()>;
    async fn find_all(&mut self, by: By) -> Result<Vec<Self::Element>>;
    async fn click_element(&mut self, element: &Self::Element, within: Duration) -> Result<()>;

    /// Text of the open alert, if one appears within `within`.
    async fn alert_text(&mut self, within: Duration) -> Result<Option<String>>;
    async fn accept_alert(&mut self) -> Result<()>;

    async fn current_window(&mut self) -> Result<Self::Window>;
    async fn windows(&mut self) -> Result<Vec<Self::Window>>;
    async fn switch_to_window(&mut self, window: Self::Window) -> Result<()>;
    /// Close the focused tab. Focus must be moved explicitly afterwards.
    async fn close_window(&mut self) -> Result<()>;

    async fn page_source(&mut self) -> Result<String>;
    async fn delete_all_cookies(&mut self) -> Result<()>;
    async fn quit(self) -> Result<()>;
}

/// Creates fresh browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Browser: Browser;

    async fn launch(&self) -> Result<Self::Browser>;
}
