//! Headless browsing capability.
//!
//! The pipeline only needs a handful of things from a browser: go to a URL,
//! wait for something to appear, and hand back the rendered markup and page
//! title. [`BrowsingSession`] names exactly that, and [`ChromeSession`]
//! implements it on top of a locally launched headless Chrome.
//!
//! Element queries are deliberately not part of the session: once the page
//! has settled its markup is snapshotted into a
//! [`RenderedDocument`](crate::render::RenderedDocument) and every query runs
//! against that snapshot.

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Flags used when no explicit Chrome options are configured.
pub const DEFAULT_CHROME_FLAGS: [&str; 3] =
    ["--no-sandbox", "--disable-dev-shm-usage", "--disable-gpu"];

/// Errors raised by a browsing session.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timed out after {timeout:?} waiting for {selector}")]
    Timeout { selector: String, timeout: Duration },

    #[error("could not read page: {0}")]
    Content(String),
}

/// Launch configuration for [`ChromeSession`].
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run without a visible window.
    pub headless: bool,
    /// Browser window size in pixels.
    pub window_size: (u32, u32),
    /// Extra command line flags. Replaces [`DEFAULT_CHROME_FLAGS`] when non-empty.
    pub chrome_flags: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            chrome_flags: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Build a config from the headless flag and a whitespace-separated list
    /// of Chrome options (as found in `CHROME_OPTIONS`).
    pub fn new(headless: bool, chrome_options: Option<&str>) -> Self {
        let chrome_flags = chrome_options
            .map(|opts| opts.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            headless,
            chrome_flags,
            ..Self::default()
        }
    }

    /// The flags actually passed to Chrome.
    pub fn effective_flags(&self) -> Vec<String> {
        if self.chrome_flags.is_empty() {
            DEFAULT_CHROME_FLAGS.iter().map(|f| f.to_string()).collect()
        } else {
            self.chrome_flags.clone()
        }
    }
}

/// The browser operations the pipeline depends on.
pub trait BrowsingSession {
    /// Navigate the current page to `url` and wait for the navigation to finish.
    fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Wait until an element matching `selector` is present.
    fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Title of the current page.
    fn title(&self) -> Result<String, BrowserError>;

    /// Serialized markup of the current page, after scripts have run.
    fn page_source(&self) -> Result<String, BrowserError>;
}

/// A headless Chrome process with a single tab.
///
/// The Chrome process lives exactly as long as this value: dropping it closes
/// the tab and shuts the browser down, on success and error paths alike.
pub struct ChromeSession {
    tab: Arc<Tab>,
    // Dropped after `tab`; killing the process is what releases the session.
    _browser: Browser,
}

impl ChromeSession {
    /// Launch Chrome with `config` and open a tab.
    #[instrument(level = "info", skip_all, fields(headless = config.headless))]
    pub fn launch(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let flags = config.effective_flags();
        for flag in &flags {
            debug!(%flag, "Chrome option");
        }
        let args: Vec<&OsStr> = flags.iter().map(OsStr::new).collect();

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some(config.window_size))
            .args(args)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let browser = Browser::new(launch_options).map_err(|e| BrowserError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        info!(flags = flags.len(), "Chrome session started");
        Ok(Self {
            tab,
            _browser: browser,
        })
    }
}

impl BrowsingSession for ChromeSession {
    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| BrowserError::Navigation(format!("{url}: {e}")))?;
        Ok(())
    }

    fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| {
                debug!(%selector, error = %e, "wait_for failed");
                BrowserError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                }
            })
    }

    fn title(&self) -> Result<String, BrowserError> {
        self.tab
            .get_title()
            .map_err(|e| BrowserError::Content(e.to_string()))
    }

    fn page_source(&self) -> Result<String, BrowserError> {
        self.tab
            .get_content()
            .map_err(|e| BrowserError::Content(e.to_string()))
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(true) {
            warn!(error = %e, "Failed to close tab cleanly");
        }
        info!("Chrome session closed");
    }
}
