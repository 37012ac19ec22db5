//! Sequencing of a complete harvest run.
//!
//! 1. **Links**: reuse the link-list checkpoint if it exists, otherwise open
//!    a browser, expand the listing and write the checkpoint
//! 2. **Articles**: build one record per link, in link order
//! 3. **Output**: write the CSV table (and the JSON export when configured)
//!
//! Only configuration and output failures abort the run. Browser, network
//! and extraction failures degrade to fewer links or emptier records.

use crate::articles::{ArticleCache, ArticlePipeline};
use crate::config::Settings;
use crate::listing::{DriverError, PaginationCollector, PaginationDriver, StopReason};
use crate::models::{ArticleLink, ArticleRecord};
use crate::outputs::{json, links, table};
use crate::pacing::Pacer;
use crate::utils::{ensure_writable_dir, ensure_writable_parent};
use futures::stream::{self, StreamExt};
use std::error::Error;
use std::future::Future;
use tracing::{error, info, instrument, warn};

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSummary {
    pub links: usize,
    /// How pagination ended, or `None` when the checkpoint was reused.
    pub collection: Option<StopReason>,
    pub records: usize,
    pub from_cache: usize,
    pub from_network: usize,
    pub failed_fetches: usize,
}

/// Run the whole harvest.
///
/// Output locations are probed before any network work. The link list is
/// then read from the checkpoint or collected through a browser, each link
/// becomes one record (at most `concurrency` fetches in flight, output kept
/// in link order), and the records are written as CSV and optionally JSON.
///
/// # Arguments
///
/// * `settings` - Validated configuration, compiled selectors and headers
/// * `pacer` - Delay strategy shared by the listing and article phases
/// * `connect` - Opens the browser; only called when no link-list
///   checkpoint exists yet. A connect error ends collection with
///   [`StopReason::DriverFailed`] instead of aborting the run
///
/// # Returns
///
/// A [`HarvestSummary`] of the run.
///
/// # Errors
///
/// Only when an output location is not writable, the checkpoint cannot be
/// read, or the HTTP client cannot be built.
#[instrument(level = "info", skip_all, fields(listing = %settings.listing_url))]
pub async fn run<D, F, Fut, P>(
    settings: &Settings,
    pacer: &P,
    connect: F,
) -> Result<HarvestSummary, Box<dyn Error>>
where
    D: PaginationDriver,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<D, DriverError>>,
    P: Pacer + Clone,
{
    let config = &settings.config;

    ensure_writable_parent(&config.links_file).await?;
    ensure_writable_parent(&config.output_csv).await?;
    if let Some(path) = &config.output_json {
        ensure_writable_parent(path).await?;
    }
    if config.use_cache {
        ensure_writable_dir(&config.cache_dir).await?;
    }

    let (article_links, collection) = if config.links_file.exists() {
        info!(path = %config.links_file.display(), "Link list found; skipping listing collection");
        (links::read_links(&config.links_file).await?, None)
    } else {
        let (found, stop) = collect_links(settings, pacer, connect).await;
        if found.is_empty() {
            warn!("No article links collected; link list not written so the next run retries");
        } else {
            links::write_links(&config.links_file, &found).await?;
        }
        (found, Some(stop))
    };
    info!(count = article_links.len(), "Loading article links");

    let cache = ArticleCache::new(
        &config.cache_dir,
        settings.headers.clone(),
        config.request_timeout(),
        config.use_cache,
        pacer.clone(),
    )?;
    let pipeline = ArticlePipeline::new(cache, &settings.selectors);

    let records: Vec<ArticleRecord> = stream::iter(article_links.iter())
        .map(|url| pipeline.build(url))
        .buffered(config.concurrency)
        .collect()
        .await;

    info!(rows = records.len(), "Creating table");
    table::write_table(&config.output_csv, &records).await?;
    if let Some(path) = &config.output_json {
        let export = json::Export::now(settings.listing_url.as_str(), &records);
        json::write_export(path, &export).await?;
    }

    let stats = pipeline.stats();
    Ok(HarvestSummary {
        links: article_links.len(),
        collection,
        records: records.len(),
        from_cache: stats.from_cache(),
        from_network: stats.from_network(),
        failed_fetches: stats.failed(),
    })
}

async fn collect_links<D, F, Fut, P>(
    settings: &Settings,
    pacer: &P,
    connect: F,
) -> (Vec<ArticleLink>, StopReason)
where
    D: PaginationDriver,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<D, DriverError>>,
    P: Pacer,
{
    let driver = match connect().await {
        Ok(driver) => driver,
        Err(e) => {
            error!(error = %e, "Could not start browser session");
            return (Vec::new(), StopReason::DriverFailed(e.to_string()));
        }
    };

    let config = &settings.config;
    let mut collector = PaginationCollector::new(
        driver,
        pacer,
        &settings.selectors.preview_link,
        config.max_iterations,
        config.interaction_timeout(),
    );
    let collection = collector.collect(&settings.listing_url).await;
    info!(articles = collection.snapshot.count(), "Completed listing collection");
    (collection.snapshot.into_links(), collection.stop)
}
