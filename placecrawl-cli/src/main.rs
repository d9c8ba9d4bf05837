//! Runs one crawl and prints its events as JSON lines.
//!
//! Configuration comes from `APPSETTING_*` variables, optionally loaded from
//! a `.env` file. Ctrl-C cancels the run before its next page.

use anyhow::{Context, Result};
use clap::Parser;
use placecrawl::prelude::*;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "placecrawl")]
#[command(about = "Extract and geocode addresses from a paginated listing")]
struct Cli {
    /// URL of the first page
    url: String,

    /// Maximum number of pages to process
    #[arg(long, env = "APPSETTING_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Concurrent geocoding lookups per page
    #[arg(long)]
    geocode_concurrency: Option<usize>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Event channel capacity
    #[arg(long, default_value_t = 32)]
    buffer: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.json_logs).map_err(anyhow::Error::msg)?;

    let mut config = CrawlerConfig::from_env().context("Failed to load configuration")?;
    if let Some(max_pages) = cli.max_pages {
        config = config.with_max_pages(max_pages);
    }
    if let Some(concurrency) = cli.geocode_concurrency {
        config = config.with_geocode_concurrency(concurrency);
    }

    let launcher = CrawlLauncher::from_config(&config).context("Failed to build pipeline")?;
    let (sink, mut events) = ChannelEventSink::channel(cli.buffer);

    let handle = launcher.start(CrawlRequest::new(&cli.url), Arc::new(sink));
    info!(run_id = %handle.run_id(), url = %cli.url, "Crawl started");

    let token = handle.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling crawl");
            token.cancel("interrupted");
        }
    });

    while let Some(event) = events.recv().await {
        println!("{}", serde_json::to_string(&event)?);
    }

    let summary = handle.join().await?;
    info!(
        pages = summary.pages_emitted,
        reason = %summary.reason,
        duration_ms = summary.duration_ms,
        "Crawl finished"
    );

    if let Some(error) = summary.error.filter(|_| !summary.reason.is_clean()) {
        anyhow::bail!("crawl stopped early ({}): {error}", summary.reason);
    }
    Ok(())
}
