//! # Archive Harvest
//!
//! Collects every article of a news site's topic archive into a table.
//!
//! ## Usage
//!
//! ```sh
//! chromedriver --port=9515 &
//! archive_harvest --listing-url https://imprintnews.org/topic/child-welfare-2 -o articles.csv
//! ```
//!
//! ## Architecture
//!
//! The run follows a pipeline:
//! 1. **Listing**: open the topic page in a browser and click "load more"
//!    until no new previews appear, then save the link list
//! 2. **Fetching**: download each article once into an on-disk cache
//! 3. **Extraction**: pull title, date, author, tags and body text from each
//!    page, every field independently
//! 4. **Output**: write a CSV table (and optionally JSON)
//!
//! Re-running with the link list and cache in place repeats no network work.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod articles;
mod cli;
mod config;
mod harvest;
mod listing;
mod models;
mod outputs;
mod pacing;
mod utils;

use cli::Cli;
use listing::webdriver::WebDriver;
use pacing::RandomPacer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("archive_harvest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = match args.load_config().and_then(|config| config.validate()) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        listing = %settings.listing_url,
        links_file = %settings.config.links_file.display(),
        cache_dir = %settings.config.cache_dir.display(),
        output = %settings.config.output_csv.display(),
        "Configuration loaded"
    );

    let pacer = RandomPacer::new(settings.config.pacing);
    let config = &settings.config;
    let summary = harvest::run(&settings, &pacer, || {
        WebDriver::connect(
            &config.webdriver_url,
            config.headless,
            &config.selectors.footer,
            &config.selectors.load_more,
            config.pacing.hover,
        )
    })
    .await
    .inspect_err(|e| error!(error = %e, "Harvest aborted"))?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        links = summary.links,
        records = summary.records,
        from_cache = summary.from_cache,
        from_network = summary.from_network,
        failed_fetches = summary.failed_fetches,
        collection = ?summary.collection,
        "Execution complete"
    );

    Ok(())
}
