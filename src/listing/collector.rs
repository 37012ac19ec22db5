//! Expands a "load more" listing page until it stops growing.
//!
//! The listing exposes no page count, so the loop watches the number of
//! preview links: every successful load-more click must reveal more links
//! than the previous snapshot held, otherwise the listing is considered
//! exhausted. A missing control, a failed click, a driver error or the
//! iteration cap also end the loop. Whatever the reason, the caller gets the
//! best snapshot seen so far and never an error.

use super::driver::{DriverError, PaginationDriver};
use super::links::extract_article_links;
use crate::models::ListingSnapshot;
use crate::pacing::Pacer;
use scraper::Selector;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Why the pagination loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A load-more click revealed no additional links.
    Stalled,
    /// The load-more control could not be found.
    AffordanceMissing,
    /// The browser failed; the message describes the failure.
    DriverFailed(String),
    /// The configured iteration cap was reached while the listing still grew.
    IterationCap,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Stalled => f.write_str("stalled"),
            StopReason::AffordanceMissing => f.write_str("affordance_missing"),
            StopReason::DriverFailed(e) => write!(f, "driver_failed: {e}"),
            StopReason::IterationCap => f.write_str("iteration_cap"),
        }
    }
}

/// Result of a pagination run.
#[derive(Debug, Clone)]
pub struct Collection {
    pub snapshot: ListingSnapshot,
    /// Number of load-more attempts made.
    pub iterations: usize,
    pub stop: StopReason,
}

pub struct PaginationCollector<'a, D, P> {
    driver: D,
    pacer: &'a P,
    preview_link: &'a Selector,
    max_iterations: usize,
    interaction_timeout: Duration,
}

impl<'a, D, P> PaginationCollector<'a, D, P>
where
    D: PaginationDriver,
    P: Pacer,
{
    pub fn new(
        driver: D,
        pacer: &'a P,
        preview_link: &'a Selector,
        max_iterations: usize,
        interaction_timeout: Duration,
    ) -> Self {
        Self {
            driver,
            pacer,
            preview_link,
            max_iterations,
            interaction_timeout,
        }
    }

    /// Drive the listing at `start` to exhaustion and close the browser.
    ///
    /// # Arguments
    ///
    /// * `start` - Listing URL; relative preview links resolve against it
    ///
    /// # Returns
    ///
    /// A [`Collection`] holding the largest snapshot seen, the number of
    /// load-more attempts and the [`StopReason`]. Driver failures and
    /// timeouts end the loop but never surface as errors.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut collector = PaginationCollector::new(driver, &pacer, &selector, 1000, timeout);
    /// let collection = collector.collect(&listing_url).await;
    /// assert!(collection.iterations <= 1000);
    /// ```
    #[instrument(level = "info", skip_all, fields(start = %start))]
    pub async fn collect(&mut self, start: &Url) -> Collection {
        let collection = self.expand(start).await;
        if let Err(e) = self.driver.close().await {
            warn!(error = %e, "Failed to close browser session");
        }
        info!(
            links = collection.snapshot.count(),
            iterations = collection.iterations,
            stop = %collection.stop,
            "Listing collection finished"
        );
        debug!(links = ?collection.snapshot.links(), "Collected links");
        collection
    }

    /// Hand back the driver, e.g. to inspect it after a run.
    pub fn into_driver(self) -> D {
        self.driver
    }

    async fn expand(&mut self, start: &Url) -> Collection {
        let mut iterations = 0;
        let mut baseline = match self.initial_snapshot(start).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Could not load listing page");
                return Collection {
                    snapshot: ListingSnapshot::default(),
                    iterations,
                    stop: StopReason::DriverFailed(e.to_string()),
                };
            }
        };
        info!(articles = baseline.count(), "Initial listing captured");

        let stop = loop {
            if iterations >= self.max_iterations {
                warn!(cap = self.max_iterations, "Iteration cap reached; listing may be incomplete");
                break StopReason::IterationCap;
            }
            iterations += 1;

            self.pacer.before_interaction().await;
            match bounded(self.interaction_timeout, self.driver.trigger_load_more()).await {
                Ok(true) => {}
                Ok(false) => {
                    info!(iterations, "Load-more control not found; listing exhausted");
                    break StopReason::AffordanceMissing;
                }
                Err(e) => {
                    warn!(iterations, error = %e, "Load-more interaction failed");
                    break StopReason::DriverFailed(e.to_string());
                }
            }
            self.pacer.after_interaction().await;

            let next = match self.snapshot(start).await {
                Ok(next) => next,
                Err(e) => {
                    warn!(iterations, error = %e, "Could not read listing after load more");
                    break StopReason::DriverFailed(e.to_string());
                }
            };
            info!(from = baseline.count(), to = next.count(), iterations, "Articles loaded");

            if !baseline.grew_into(&next) {
                info!(from = baseline.count(), to = next.count(), "Listing stopped growing");
                break StopReason::Stalled;
            }
            baseline = next;
        };

        Collection {
            snapshot: baseline,
            iterations,
            stop,
        }
    }

    async fn initial_snapshot(&mut self, start: &Url) -> Result<ListingSnapshot, DriverError> {
        bounded(self.interaction_timeout, self.driver.navigate(start.as_str())).await?;
        self.snapshot(start).await
    }

    /// Relative preview links are resolved against the listing URL.
    async fn snapshot(&mut self, base: &Url) -> Result<ListingSnapshot, DriverError> {
        let markup = bounded(self.interaction_timeout, self.driver.current_markup()).await?;
        Ok(extract_article_links(&markup, base, self.preview_link))
    }
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, DriverError>>,
) -> Result<T, DriverError> {
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout(limit)),
    }
}
