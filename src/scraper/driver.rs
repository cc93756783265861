//! WebDriver-backed browser sessions (chromedriver via fantoccini).

use crate::config::{BrowserConfig, SiteConfig};
use crate::error::ScrapeError;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::wd::{TimeoutConfiguration, WindowHandle};
use fantoccini::{Client, ClientBuilder, Locator};
use rand::seq::IndexedRandom;
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{Browser, BrowserLauncher, By, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ── Launcher ──────────────────────────────────────────────────────────────────

pub struct WebDriverLauncher {
    webdriver_url: String,
    config: BrowserConfig,
}

impl WebDriverLauncher {
    pub fn new(site: &SiteConfig, config: &BrowserConfig) -> Self {
        Self {
            webdriver_url: site.webdriver_url.clone(),
            config: config.clone(),
        }
    }

    /// A different identity per session makes the scraper harder to block.
    fn pick_user_agent(&self) -> String {
        self.config
            .user_agents
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string())
    }

    fn capabilities(&self, user_agent: &str) -> Map<String, Value> {
        let mut args = vec![
            "--no-proxy-server".to_string(),
            "--proxy-server=direct://".to_string(),
            "--proxy-bypass-list=*".to_string(),
            "--window-size=1920,1080".to_string(),
            format!("--user-agent={}", user_agent),
        ];
        if self.config.headless {
            args.insert(0, "--headless".to_string());
        }

        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    type Browser = WebDriverBrowser;

    async fn launch(&self) -> Result<WebDriverBrowser> {
        let user_agent = self.pick_user_agent();
        debug!("Connecting to WebDriver at {} as {:?}", self.webdriver_url, user_agent);

        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities(&user_agent));
        let client = builder
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| ScrapeError::Session(format!("{}: {}", self.webdriver_url, e)))?;

        let timeouts = TimeoutConfiguration::new(
            None,
            Some(self.config.explicit_wait()),
            Some(self.config.implicit_wait()),
        );
        client
            .update_timeouts(timeouts)
            .await
            .map_err(|e| map_cmd("set timeouts", e))?;

        // Headless drivers may refuse to change window state.
        if let Err(e) = client.maximize_window().await {
            warn!("Could not maximize browser window: {}", e);
        }

        Ok(WebDriverBrowser { client })
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct WebDriverBrowser {
    client: Client,
}

/// fantoccini locators borrow their selector, so name lookups need an owned
/// CSS string to point at.
enum Query {
    Css(String),
    XPath(&'static str),
}

impl Query {
    fn new(by: By) -> Self {
        match by {
            By::Name(name) => Query::Css(format!(r#"[name="{}"]"#, name)),
            By::Css(css) => Query::Css(css.to_string()),
            By::XPath(xpath) => Query::XPath(xpath),
        }
    }

    fn locator(&self) -> Locator<'_> {
        match self {
            Query::Css(css) => Locator::Css(css),
            Query::XPath(xpath) => Locator::XPath(xpath),
        }
    }
}

fn map_cmd(context: &str, e: CmdError) -> ScrapeError {
    let timed_out = match &e {
        CmdError::WaitTimeout => true,
        CmdError::Standard(wd) => matches!(wd.error, ErrorStatus::Timeout | ErrorStatus::ScriptTimeout),
        _ => false,
    };
    if timed_out {
        ScrapeError::NavigationTimeout(format!("{}: {}", context, e))
    } else {
        ScrapeError::UnknownFailure(format!("{}: {}", context, e))
    }
}

impl WebDriverBrowser {
    async fn find(&self, by: By) -> Result<Element> {
        let query = Query::new(by);
        self.client
            .find(query.locator())
            .await
            .map_err(|e| map_cmd(&format!("find {}", by), e))
    }

    /// Click, retrying while the element is present but not yet interactive.
    async fn click_until(element: &Element, deadline: Instant, what: &str) -> Result<()> {
        loop {
            match element.click().await {
                Ok(()) => return Ok(()),
                Err(CmdError::Standard(wd)) if Instant::now() < deadline => {
                    debug!("{} not clickable yet: {}", what, wd);
                    sleep(POLL_INTERVAL).await;
                }
                Err(CmdError::Standard(wd)) => {
                    return Err(ScrapeError::NavigationTimeout(format!(
                        "{} never became clickable: {}",
                        what, wd
                    )));
                }
                Err(e) => return Err(map_cmd(what, e)),
            }
        }
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    type Element = Element;
    type Window = WindowHandle;

    async fn goto(&mut self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .map_err(|e| map_cmd(&format!("goto {}", url), e))
    }

    async fn select_by_value(&mut self, by: By, value: &str) -> Result<()> {
        let element = self.find(by).await?;
        element
            .select_by_value(value)
            .await
            .map_err(|e| map_cmd(&format!("select {} on {}", value, by), e))
    }

    async fn fill(&mut self, by: By, text: &str) -> Result<()> {
        let element = self.find(by).await?;
        element
            .clear()
            .await
            .map_err(|e| map_cmd(&format!("clear {}", by), e))?;
        element
            .send_keys(text)
            .await
            .map_err(|e| map_cmd(&format!("type into {}", by), e))
    }

    async fn click(&mut self, by: By, within: Duration) -> Result<()> {
        let deadline = Instant::now() + within;
        let query = Query::new(by);
        let element = self
            .client
            .wait()
            .at_most(within)
            .for_element(query.locator())
            .await
            .map_err(|e| map_cmd(&format!("wait for {}", by), e))?;
        Self::click_until(&element, deadline, &by.to_string()).await
    }

    async fn wait_for(&mut self, by: By, within: Duration) -> Result<()> {
        let query = Query::new(by);
        self.client
            .wait()
            .at_most(within)
            .for_element(query.locator())
            .await
            .map(|_| ())
            .map_err(|e| map_cmd(&format!("wait for {}", by), e))
    }

    async fn find_all(&mut self, by: By) -> Result<Vec<Element>> {
        let query = Query::new(by);
        self.client
            .find_all(query.locator())
            .await
            .map_err(|e| map_cmd(&format!("find all {}", by), e))
    }

    async fn click_element(&mut self, element: &Element, within: Duration) -> Result<()> {
        Self::click_until(element, Instant::now() + within, "case action").await
    }

    async fn alert_text(&mut self, within: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + within;
        loop {
            match self.client.get_alert_text().await {
                Ok(text) => return Ok(Some(text)),
                Err(_) if Instant::now() >= deadline => return Ok(None),
                Err(_) => sleep(POLL_INTERVAL).await,
            }
        }
    }

    async fn accept_alert(&mut self) -> Result<()> {
        self.client
            .accept_alert()
            .await
            .map_err(|e| map_cmd("accept alert", e))
    }

    async fn current_window(&mut self) -> Result<WindowHandle> {
        self.client.window().await.map_err(|e| map_cmd("current window", e))
    }

    async fn windows(&mut self) -> Result<Vec<WindowHandle>> {
        self.client.windows().await.map_err(|e| map_cmd("list windows", e))
    }

    async fn switch_to_window(&mut self, window: WindowHandle) -> Result<()> {
        self.client
            .switch_to_window(window)
            .await
            .map_err(|e| map_cmd("switch window", e))
    }

    async fn close_window(&mut self) -> Result<()> {
        self.client
            .close_window()
            .await
            .map_err(|e| map_cmd("close window", e))
    }

    async fn page_source(&mut self) -> Result<String> {
        self.client.source().await.map_err(|e| map_cmd("page source", e))
    }

    async fn delete_all_cookies(&mut self) -> Result<()> {
        self.client
            .delete_all_cookies()
            .await
            .map_err(|e| map_cmd("delete cookies", e))
    }

    async fn quit(self) -> Result<()> {
        self.client.close().await.map_err(|e| map_cmd("quit", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher(headless: bool, agents: Vec<String>) -> WebDriverLauncher {
        let browser = BrowserConfig {
            headless,
            user_agents: agents,
            ..Default::default()
        };
        WebDriverLauncher::new(&SiteConfig::default(), &browser)
    }

    fn args(caps: &Map<String, Value>) -> Vec<String> {
        caps["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_capabilities_disable_proxy_and_spoof_identity() {
        let l = launcher(true, vec!["UA-1".into()]);
        let ua = l.pick_user_agent();
        assert_eq!(ua, "UA-1");

        let args = args(&l.capabilities(&ua));
        assert_eq!(args[0], "--headless");
        assert!(args.contains(&"--no-proxy-server".to_string()));
        assert!(args.contains(&"--proxy-bypass-list=*".to_string()));
        assert!(args.contains(&"--user-agent=UA-1".to_string()));
    }

    #[test]
    fn test_headful_and_empty_agent_pool() {
        let l = launcher(false, vec![]);
        let ua = l.pick_user_agent();
        assert_eq!(ua, FALLBACK_USER_AGENT);
        assert!(!args(&l.capabilities(&ua)).contains(&"--headless".to_string()));
    }

    #[test]
    fn test_name_query_becomes_css() {
        let q = Query::new(By::Name("begdate"));
        assert!(matches!(q, Query::Css(ref s) if s == r#"[name="begdate"]"#));
    }
}
