use std::{io, path::PathBuf, time::Duration};

use anyhow::Context;
use capturer::{
    browser_controller::{BrowserController, BrowserOptions},
    runner::{Runner, RunnerOptions},
    sites::{load_sites, select_sites, SITES},
    types::Viewport,
    utils::SCREENSHOTS_DIR,
};
use clap::Parser;
use log::debug;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Capture screenshots of deployed sites", long_about = None)]
struct Args {
    /// Directory the <slug>.png files are written to
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,
    /// JSON file with a list of {"slug", "url"} objects, replacing the built in list
    #[arg(short = 's', long)]
    sites: Option<PathBuf>,
    /// Only capture these slugs (repeatable)
    #[arg(long)]
    only: Vec<String>,
    /// Maximum time in seconds to wait for navigation and network idle
    #[arg(short = 't', long, default_value_t = 30)]
    timeout: u64,
    /// Time in seconds to wait after network idle before capturing
    #[arg(long, default_value_t = 2)]
    settle: u64,
    /// Viewport size as WIDTHxHEIGHT
    #[arg(long, default_value_t = Viewport::default())]
    viewport: Viewport,
    /// Capture only the viewport instead of the full page
    #[arg(long)]
    viewport_only: bool,
    /// Show the browser window
    #[arg(long)]
    headed: bool,
    /// Path to the chrome binary
    #[arg(long)]
    chrome: Option<PathBuf>,
    /// Print the site list and exit
    #[arg(short = 'l', long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let sites = match &args.sites {
        Some(path) => load_sites(path)?,
        None => SITES.clone(),
    };
    let sites = select_sites(&sites, &args.only)?;

    if args.list {
        for site in &sites {
            println!("{:<24} {}", site.slug, site.url);
        }
        return Ok(());
    }

    debug!("Starting capture with {:#?}", args.clone());

    let navigation_timeout = Duration::from_secs(args.timeout);
    let settle_delay = Duration::from_secs(args.settle);

    let options = RunnerOptions::default_builder()
        .output_dir(args.output_dir.unwrap_or_else(|| SCREENSHOTS_DIR.clone()))
        .viewport(args.viewport)
        .navigation_timeout(navigation_timeout)
        .settle_delay(settle_delay)
        .full_page(!args.viewport_only)
        .build()?;

    let browser_options = BrowserOptions::default_builder()
        .chrome_path(args.chrome)
        .headless(!args.headed)
        .viewport(args.viewport)
        .idle_timeout(navigation_timeout + settle_delay + Duration::from_secs(30))
        .build()?;

    let runner = Runner::new(options);
    let mut stdout = io::stdout();
    runner.prepare(&sites, &mut stdout)?;

    let browser = BrowserController::launch(&browser_options).context("could not launch browser")?;
    runner.capture_all(&browser, &sites, &mut stdout).await?;

    // dropping the controller shuts the browser down
    drop(browser);

    Ok(())
}
