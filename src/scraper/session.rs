//! Lifecycle of the one browser session a run drives.

use crate::error::ScrapeError;
use tracing::{info, warn};

use super::{Browser, BrowserLauncher, Result};

pub struct SessionManager<L: BrowserLauncher> {
    launcher: L,
    browser: Option<L::Browser>,
    launches: usize,
}

impl<L: BrowserLauncher> SessionManager<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            browser: None,
            launches: 0,
        }
    }

    /// Launch a session unless one is already running.
    pub async fn start(&mut self) -> Result<&mut L::Browser> {
        if self.browser.is_none() {
            let browser = self.launcher.launch().await?;
            self.launches += 1;
            info!("Browser session started (launch #{})", self.launches);
            self.browser = Some(browser);
        }
        self.browser()
    }

    /// Shut the session down. Quit failures are logged, never raised: the
    /// session is being discarded either way.
    pub async fn stop(&mut self) {
        if let Some(browser) = self.browser.take() {
            if let Err(e) = browser.quit().await {
                warn!("Browser did not shut down cleanly: {}", e);
            }
        }
    }

    /// Throw away the current session and open a fresh one.
    pub async fn restart(&mut self) -> Result<&mut L::Browser> {
        warn!("Restarting browser session");
        self.stop().await;
        self.start().await
    }

    pub fn browser(&mut self) -> Result<&mut L::Browser> {
        self.browser
            .as_mut()
            .ok_or_else(|| ScrapeError::Session("no browser session is running".into()))
    }

    /// Number of sessions launched so far.
    pub fn launches(&self) -> usize {
        self.launches
    }
}
