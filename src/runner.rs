use std::{
    fs,
    io::Write,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use tokio::time::sleep;

use crate::{
    browser_controller::{CapturePage, PageSource},
    network_idle::{IdleStatus, IdleTracker},
    sites::Site,
    types::{BatchReport, CaptureError, CaptureOutcome, Viewport},
    utils::{
        file_name, screenshot_path, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_SETTLE_DELAY,
        NETWORK_IDLE_POLL, NETWORK_IDLE_WINDOW, SCREENSHOTS_DIR,
    },
};

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct RunnerOptions {
    // directory the <slug>.png files are written to
    #[builder(default = "self.default_output_dir()")]
    output_dir: PathBuf,
    #[builder(default = "Viewport::default()")]
    viewport: Viewport,
    // upper bound for navigation plus waiting on network idle
    #[builder(default = "DEFAULT_NAVIGATION_TIMEOUT")]
    navigation_timeout: Duration,
    // how long the resource count must hold still to count as idle
    #[builder(default = "NETWORK_IDLE_WINDOW")]
    idle_window: Duration,
    #[builder(default = "NETWORK_IDLE_POLL")]
    idle_poll: Duration,
    // pause after network idle so animations can finish
    #[builder(default = "DEFAULT_SETTLE_DELAY")]
    settle_delay: Duration,
    #[builder(default = "true")]
    full_page: bool,
}

impl RunnerOptions {
    pub fn default_builder() -> RunnerOptionsBuilder {
        RunnerOptionsBuilder::default()
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }
}

impl RunnerOptionsBuilder {
    fn default_output_dir(&self) -> PathBuf {
        SCREENSHOTS_DIR.clone()
    }
}

/// Captures sites one after another from a single `PageSource`.
pub struct Runner {
    options: RunnerOptions,
}

impl Runner {
    pub fn new(options: RunnerOptions) -> Self {
        Runner { options }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Creates the output directory and announces the batch. Needs no
    /// browser, so it runs before one is launched.
    pub fn prepare<W: Write>(&self, sites: &[Site], out: &mut W) -> anyhow::Result<()> {
        let dir = &self.options.output_dir;
        fs::create_dir_all(dir).context(format!("could not create output directory {:?}", dir))?;

        info!(
            "capturing {} sites into {:?} (viewport {}, timeout {:?}, settle {:?})",
            sites.len(),
            dir,
            self.options.viewport,
            self.options.navigation_timeout,
            self.options.settle_delay
        );
        writeln!(out, "Capturing {} screenshots...", sites.len())?;
        Ok(())
    }

    /// Captures every site in order and writes status lines and the summary
    /// to `out`. Individual capture failures are reported, never returned.
    pub async fn capture_all<S: PageSource, W: Write>(
        &self,
        source: &S,
        sites: &[Site],
        out: &mut W,
    ) -> anyhow::Result<BatchReport> {
        // one page at a time against the single browser
        let mut report = BatchReport::default();
        for site in sites {
            let outcome = self.capture(source, site).await;
            match &outcome.result {
                Ok(path) => writeln!(out, "  OK  {} -> {}", site.slug, file_name(path))?,
                Err(e) => writeln!(out, "  FAIL {}: {}", site.slug, e)?,
            }
            report.outcomes.push(outcome);
        }

        writeln!(out)?;
        writeln!(
            out,
            "Done: {}/{} captured to {}",
            report.captured(),
            report.total(),
            self.options.output_dir.display()
        )?;
        info!("{} of {} captures succeeded", report.captured(), report.total());

        Ok(report)
    }

    pub async fn run<S: PageSource, W: Write>(
        &self,
        source: &S,
        sites: &[Site],
        out: &mut W,
    ) -> anyhow::Result<BatchReport> {
        self.prepare(sites, out)?;
        self.capture_all(source, sites, out).await
    }

    pub async fn capture<S: PageSource>(&self, source: &S, site: &Site) -> CaptureOutcome {
        let result = self.try_capture(source, site).await;
        if let Err(e) = &result {
            debug!("capture of {} failed: {}", site.url, e);
        }
        CaptureOutcome {
            site: site.clone(),
            result,
        }
    }

    async fn try_capture<S: PageSource>(
        &self,
        source: &S,
        site: &Site,
    ) -> Result<PathBuf, CaptureError> {
        // the page is closed when it goes out of scope, whichever way we leave
        let page = source.open_page(self.options.viewport)?;
        let deadline = Instant::now() + self.options.navigation_timeout;
        page.navigate(&site.url, self.options.navigation_timeout)?;
        self.wait_for_network_idle(&page, &site.url, deadline).await?;

        debug!("sleeping for {:?}", self.options.settle_delay);
        sleep(self.options.settle_delay).await;

        let png = page.screenshot(self.options.full_page)?;
        let path = screenshot_path(&self.options.output_dir, &site.slug);
        debug!("saving screenshot of {} to {:?}", site.url, path);
        fs::write(&path, png).map_err(|e| CaptureError::Write {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Ok(path)
    }

    async fn wait_for_network_idle<P: CapturePage>(
        &self,
        page: &P,
        url: &str,
        deadline: Instant,
    ) -> Result<(), CaptureError> {
        let mut tracker = IdleTracker::new(self.options.idle_window, deadline);
        loop {
            let state = page.load_state()?;
            match tracker.observe(&state, Instant::now()) {
                IdleStatus::Idle => {
                    debug!("network idle on {} after {} resources", url, state.resources);
                    return Ok(());
                }
                IdleStatus::TimedOut => {
                    return Err(CaptureError::Timeout {
                        url: url.into(),
                        timeout: self.options.navigation_timeout,
                    })
                }
                IdleStatus::Busy => sleep(self.options.idle_poll).await,
            }
        }
    }
}
