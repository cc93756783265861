use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::dates::DEFAULT_MAX_SPAN_DAYS;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Court-records site endpoints and search parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,

    #[serde(default = "default_case_search_url")]
    pub case_search_url: String,

    /// Classification code selecting eviction filings in the search form.
    #[serde(default = "default_classification_code")]
    pub classification_code: String,

    /// WebDriver server (chromedriver) the browser session is opened on.
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_explicit_wait_secs")]
    pub explicit_wait_secs: u64,

    #[serde(default = "default_implicit_wait_secs")]
    pub implicit_wait_secs: u64,

    #[serde(default = "default_alert_wait_secs")]
    pub alert_wait_secs: u64,

    #[serde(default = "default_case_pause_ms")]
    pub case_pause_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

/// Run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default = "default_max_span_days")]
    pub max_span_days: u64,
}

impl BrowserConfig {
    pub fn explicit_wait(&self) -> Duration {
        Duration::from_secs(self.explicit_wait_secs)
    }

    pub fn implicit_wait(&self) -> Duration {
        Duration::from_secs(self.implicit_wait_secs)
    }

    pub fn alert_wait(&self) -> Duration {
        Duration::from_secs(self.alert_wait_secs)
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_search_url() -> String {
    "https://www.courtclerk.org/records-search/municipal-civil-listing-by-classification/".to_string()
}
fn default_case_search_url() -> String {
    "https://www.courtclerk.org/records-search/case-number-search/".to_string()
}
fn default_classification_code() -> String {
    "G".to_string()
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}
fn default_true() -> bool {
    true
}
fn default_explicit_wait_secs() -> u64 {
    50
}
fn default_implicit_wait_secs() -> u64 {
    20
}
fn default_alert_wait_secs() -> u64 {
    3
}
fn default_case_pause_ms() -> u64 {
    3000
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.80",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_max_span_days() -> u64 {
    DEFAULT_MAX_SPAN_DAYS
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            case_search_url: default_case_search_url(),
            classification_code: default_classification_code(),
            webdriver_url: default_webdriver_url(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            explicit_wait_secs: default_explicit_wait_secs(),
            implicit_wait_secs: default_implicit_wait_secs(),
            alert_wait_secs: default_alert_wait_secs(),
            case_pause_ms: default_case_pause_ms(),
            jitter_ms: default_jitter_ms(),
            user_agents: default_user_agents(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_span_days: default_max_span_days(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("EVICTION").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|e| {
            warn!("Could not read configuration ({}), using defaults", e);
            AppConfig::default()
        });
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("site.search_url", &self.site.search_url),
            ("site.case_search_url", &self.site.case_search_url),
            ("site.webdriver_url", &self.site.webdriver_url),
        ] {
            Url::parse(value).with_context(|| format!("{} is not a valid URL: {:?}", name, value))?;
        }

        anyhow::ensure!(
            self.run.max_span_days >= 1,
            "run.max_span_days must be at least 1"
        );
        Ok(())
    }
}
