use anyhow::{anyhow, Context, Result};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::types::Bounds;
use headless_chrome::Tab;
use headless_chrome::{browser::default_executable, Browser, LaunchOptions};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::network_idle::LoadState;
use crate::types::{CaptureError, Viewport};
use crate::utils::MAX_FULL_PAGE_HEIGHT;

const LOAD_STATE_SCRIPT: &str =
    "JSON.stringify([document.readyState, performance.getEntriesByType('resource').length])";

const CONTENT_HEIGHT_SCRIPT: &str = r#"Math.max(
    document.documentElement ? document.documentElement.scrollHeight : 0,
    document.body ? document.body.scrollHeight : 0
)"#;

/// Height to stretch the window to for a full page capture, or `None` when
/// the page already fits the viewport.
pub fn full_page_height(content_height: u32, viewport: Viewport) -> Option<u32> {
    let height = content_height.min(MAX_FULL_PAGE_HEIGHT);
    if height > viewport.height {
        Some(height)
    } else {
        None
    }
}

fn navigation_error(url: &str, e: impl fmt::Display) -> CaptureError {
    CaptureError::Navigation {
        url: url.into(),
        reason: e.to_string(),
    }
}

/// Something that can hand out fresh pages to capture from.
pub trait PageSource {
    type Page: CapturePage;

    fn open_page(&self, viewport: Viewport) -> Result<Self::Page, CaptureError>;
}

/// A single open page. Implementations release the page when dropped.
pub trait CapturePage {
    /// Navigates and blocks until the main document has loaded, or fails
    /// once `timeout` has elapsed.
    fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CaptureError>;

    /// Samples the page's loading progress for network idle detection.
    fn load_state(&self) -> Result<LoadState, CaptureError>;

    /// Returns PNG bytes.
    fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, CaptureError>;
}

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct BrowserOptions {
    // explicit chrome binary, otherwise the usual install locations are searched
    #[builder(default = "None")]
    chrome_path: Option<PathBuf>,
    #[builder(default = "true")]
    headless: bool,
    #[builder(default = "Viewport::default()")]
    viewport: Viewport,
    // how long the browser may go without sending an event before it is considered dead
    #[builder(default = "Duration::from_secs(60)")]
    idle_timeout: Duration,
}

impl BrowserOptions {
    pub fn default_builder() -> BrowserOptionsBuilder {
        BrowserOptionsBuilder::default()
    }
}

pub struct BrowserController {
    browser: Browser,
}

impl BrowserController {
    pub fn launch(options: &BrowserOptions) -> Result<Self> {
        let is_docker = std::env::var("IN_DOCKER").is_ok();
        let path = match &options.chrome_path {
            Some(p) => p.clone(),
            None => default_executable().map_err(|e| anyhow!(e))?,
        };
        debug!(
            "launching chrome from {:?} (headless: {}, window {})",
            path, options.headless, options.viewport
        );
        let launch_options = LaunchOptions::default_builder()
            .path(Some(path))
            .headless(options.headless)
            .window_size(Some((options.viewport.width, options.viewport.height)))
            .idle_browser_timeout(options.idle_timeout)
            // warning only do this if in docker env
            .sandbox(!is_docker)
            .build()
            .map_err(|e| anyhow!("invalid browser launch options: {}", e))?;
        let browser = Browser::new(launch_options).context("browser launching error")?;

        Ok(BrowserController { browser })
    }

    pub fn open_tabs(&self) -> usize {
        match self.browser.get_tabs().lock() {
            Ok(tabs) => tabs.len(),
            Err(_) => 0,
        }
    }
}

impl PageSource for BrowserController {
    type Page = ChromePage;

    fn open_page(&self, viewport: Viewport) -> Result<ChromePage, CaptureError> {
        // default context, closing the tab leaves nothing behind
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| CaptureError::OpenPage(format!("could not create new tab: {}", e)))?;

        let page = ChromePage { tab, viewport };
        page.resize(viewport.height)
            .map_err(|e| CaptureError::OpenPage(format!("could not set viewport: {}", e)))?;
        Ok(page)
    }
}

impl Drop for BrowserController {
    fn drop(&mut self) {
        debug!("closing browser process...");
    }
}

pub struct ChromePage {
    tab: Arc<Tab>,
    viewport: Viewport,
}

impl ChromePage {
    fn resize(&self, height: u32) -> Result<()> {
        self.tab.set_bounds(Bounds::Normal {
            left: Some(0),
            top: Some(0),
            width: Some(self.viewport.width as f64),
            height: Some(height as f64),
        })?;
        Ok(())
    }

    fn read_load_state(&self) -> Result<LoadState> {
        let res = self.tab.evaluate(LOAD_STATE_SCRIPT, false)?;
        match res.value {
            Some(serde_json::Value::String(s)) => {
                let (ready_state, resources): (String, u64) = serde_json::from_str(&s)?;
                Ok(LoadState {
                    ready_state,
                    resources,
                })
            }
            other => Err(anyhow!("unexpected load state {:?}", other)),
        }
    }

    fn content_height(&self) -> Result<u32> {
        let res = self.tab.evaluate(CONTENT_HEIGHT_SCRIPT, false)?;
        let height = res
            .value
            .as_ref()
            .and_then(|v| v.as_f64())
            .ok_or_else(|| anyhow!("page height unavailable"))?;
        Ok(height.ceil().max(0.0) as u32)
    }
}

impl CapturePage for ChromePage {
    fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CaptureError> {
        let deadline = Instant::now() + timeout;
        self.tab.set_default_timeout(timeout);

        debug!("navigating to {}", url);
        self.tab
            .navigate_to(url)
            .map_err(|e| navigation_error(url, e))?;
        if let Err(e) = self.tab.wait_until_navigated() {
            if Instant::now() >= deadline {
                return Err(CaptureError::Timeout {
                    url: url.into(),
                    timeout,
                });
            }
            return Err(navigation_error(url, e));
        }
        Ok(())
    }

    fn load_state(&self) -> Result<LoadState, CaptureError> {
        self.read_load_state().map_err(|e| navigation_error(&self.tab.get_url(), e))
    }

    fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, CaptureError> {
        if full_page {
            let content_height = self
                .content_height()
                .map_err(|e| CaptureError::Screenshot(e.to_string()))?;
            if let Some(height) = full_page_height(content_height, self.viewport) {
                debug!("expanding page to {}px for full page capture", height);
                self.resize(height)
                    .map_err(|e| CaptureError::Screenshot(e.to_string()))?;
            }
        }

        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| CaptureError::Screenshot(e.to_string()))
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        debug!("closing tab {}", self.tab.get_url());
        if let Err(e) = self.tab.close(true) {
            warn!("could not close tab {}: {}", self.tab.get_url(), e);
        }
    }
}
