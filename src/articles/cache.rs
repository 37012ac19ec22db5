//! On-disk cache of raw article pages.
//!
//! Every article URL maps to `<cache_dir>/<slug>-<digest>.html`, where the
//! slug is a fixed path segment of the URL and the digest is taken over the
//! whole URL (see [`cache_key`]). A cached page is
//! returned without touching the network, which makes re-runs idempotent and
//! lets an interrupted batch resume where it stopped. Pages are written
//! through a temporary file and renamed into place, so a crash never leaves
//! a truncated entry behind.

use super::fields::cache_key;
use crate::models::{CachedDocument, Origin};
use crate::pacing::Pacer;
use rand::{Rng, rng};
use reqwest::Client;
use reqwest::header::HeaderMap;
use std::error::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug)]
pub struct ArticleCache<P> {
    dir: PathBuf,
    client: Client,
    use_cache: bool,
    pacer: P,
}

impl<P: Pacer> ArticleCache<P> {
    /// Build a cache rooted at `dir` whose downloads send `headers` and give
    /// up after `timeout`.
    pub fn new(
        dir: impl Into<PathBuf>,
        headers: HeaderMap,
        timeout: Duration,
        use_cache: bool,
        pacer: P,
    ) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            dir: dir.into(),
            client,
            use_cache,
            pacer,
        })
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.html", cache_key(url)))
    }

    /// Return the page for `url`, from disk when possible.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute article URL; it also determines the cache file
    ///
    /// # Returns
    ///
    /// A [`CachedDocument`] whose `origin` says whether the markup came from
    /// disk or the network. This never fails: a non-2xx status, a refused
    /// connection or a request that outlives the configured timeout is logged
    /// and reported as a network document with empty markup. Empty markup is
    /// never written to disk, so the next run retries that URL.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let cache = ArticleCache::new("articles", headers, Duration::from_secs(30), true, NoDelay)?;
    /// let doc = cache.fetch("https://site.example/news/child-welfare/slug-123").await;
    /// if doc.is_empty() {
    ///     // fetch failed; caller keeps a best-effort record
    /// }
    /// ```
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, url: &str) -> CachedDocument {
        let path = self.path_for(url);

        if self.use_cache {
            match fs::read_to_string(&path).await {
                Ok(raw_markup) => {
                    info!(path = %path.display(), "Loading cached article");
                    return CachedDocument {
                        url: url.to_string(),
                        raw_markup,
                        origin: Origin::Cache,
                    };
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable cache entry; downloading again");
                }
            }
        }

        self.pacer.before_request().await;
        info!("Downloading article");
        let raw_markup = match self.download(url).await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Article didn't load");
                String::new()
            }
        };

        if self.use_cache && !raw_markup.is_empty() {
            if let Err(e) = persist(&self.dir, &path, &raw_markup).await {
                warn!(path = %path.display(), error = %e, "Failed to cache article");
            }
        }

        CachedDocument {
            url: url.to_string(),
            raw_markup,
            origin: Origin::Network,
        }
    }

    async fn download(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        debug!(bytes = body.len(), "Downloaded article");
        Ok(body)
    }
}

async fn persist(dir: &Path, path: &Path, markup: &str) -> std::io::Result<()> {
    fs::create_dir_all(dir).await?;
    let tmp = path.with_extension(format!("html.{:08x}.tmp", rng().random::<u32>()));
    fs::write(&tmp, markup).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
