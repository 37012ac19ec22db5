//! One article URL in, one [`ArticleRecord`] out.

use super::cache::ArticleCache;
use super::fields::{self, FieldError, article_type};
use crate::config::CompiledSelectors;
use crate::models::{ArticleRecord, Origin};
use crate::pacing::Pacer;
use scraper::Html;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, instrument, warn};

/// Where the pipeline's documents came from so far.
#[derive(Debug, Default)]
pub struct PipelineStats {
    from_cache: AtomicUsize,
    from_network: AtomicUsize,
    failed: AtomicUsize,
}

impl PipelineStats {
    pub fn from_cache(&self) -> usize {
        self.from_cache.load(Ordering::Relaxed)
    }

    pub fn from_network(&self) -> usize {
        self.from_network.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

pub struct ArticlePipeline<'a, P> {
    cache: ArticleCache<P>,
    selectors: &'a CompiledSelectors,
    stats: PipelineStats,
}

impl<'a, P: Pacer> ArticlePipeline<'a, P> {
    pub fn new(cache: ArticleCache<P>, selectors: &'a CompiledSelectors) -> Self {
        Self {
            cache,
            selectors,
            stats: PipelineStats::default(),
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Fetch and extract the article at `url`.
    ///
    /// Always yields a record. If the page could not be fetched only `url`
    /// and `type` are filled in.
    #[instrument(level = "info", skip(self))]
    pub async fn build(&self, url: &str) -> ArticleRecord {
        let kind = article_type(url);
        let document = self.cache.fetch(url).await;

        if document.is_empty() {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!("No markup; keeping best-effort record");
            return ArticleRecord::best_effort(url, kind);
        }
        match document.origin {
            Origin::Cache => self.stats.from_cache.fetch_add(1, Ordering::Relaxed),
            Origin::Network => self.stats.from_network.fetch_add(1, Ordering::Relaxed),
        };

        info!(origin = %document.origin, "Extracting article");
        self.extract(&document.url, kind, &document.raw_markup)
    }

    fn extract(&self, url: &str, kind: String, markup: &str) -> ArticleRecord {
        let page = Html::parse_document(markup);
        let s = self.selectors;
        ArticleRecord {
            url: url.to_string(),
            title: or_default(url, "title", fields::title(&page, s)),
            date: or_default(url, "date", fields::date(&page, s)),
            author: or_default(url, "author", fields::author(&page, s)),
            tags: or_default(url, "tags", fields::tags(&page, s)),
            kind,
            text: or_default(url, "text", fields::text(&page, s)),
        }
    }
}

fn or_default<T: Default>(url: &str, field: &'static str, value: Result<T, FieldError>) -> T {
    value.unwrap_or_else(|e| {
        warn!(%url, field, error = %e, "Field extraction failed");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::articles::testing::{NewsSite, article_page, unresponsive_site};
    use crate::config::DEFAULT_SELECTORS;
    use crate::pacing::NoDelay;
    use reqwest::header::HeaderMap;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn pipeline(dir: &Path) -> ArticlePipeline<'static, NoDelay> {
        let cache =
            ArticleCache::new(dir, HeaderMap::new(), Duration::from_secs(5), true, NoDelay).unwrap();
        ArticlePipeline::new(cache, &DEFAULT_SELECTORS)
    }

    #[tokio::test]
    async fn test_builds_full_record() {
        let site = NewsSite::serve(vec![("/news/foster/story", 200, article_page("Hearing"))]);
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());
        let url = site.url("/news/foster/story");

        let record = pipeline.build(&url).await;
        assert_eq!(
            record,
            ArticleRecord {
                url: url.clone(),
                title: "Hearing".into(),
                date: "January 5, 2024".into(),
                author: "Pat Writer".into(),
                tags: vec!["Foster Care".into(), "Policy".into()],
                kind: "news".into(),
                text: "Hearing opens.\nHearing closes.".into(),
            }
        );
        assert_eq!(pipeline.stats().from_network(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_gives_best_effort_record() {
        let site = NewsSite::serve(vec![]);
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());
        let url = site.url("/news/child-welfare/slug-123");

        let record = pipeline.build(&url).await;
        assert_eq!(record, ArticleRecord::best_effort(&url, "news".into()));
        assert_eq!(pipeline.stats().failed(), 1);
    }

    #[tokio::test]
    async fn test_missing_tags_leave_other_fields_intact() {
        let dir = TempDir::new().unwrap();
        let url = "https://site.example/features/untagged/9";
        std::fs::write(
            dir.path().join(format!("{}.html", fields::cache_key(url))),
            r#"<h1>No Tags Here</h1>
               <div class="article-content"><p>Body text.</p></div>"#,
        )
        .unwrap();
        let pipeline = pipeline(dir.path());

        let record = pipeline.build(url).await;
        assert_eq!(record.title, "No Tags Here");
        assert_eq!(record.text, "Body text.");
        assert!(record.tags.is_empty());
        assert_eq!(record.date, "");
        assert_eq!(record.author, "");
        assert_eq!(record.kind, "features");
        assert_eq!(pipeline.stats().from_cache(), 1);
    }

    #[tokio::test]
    async fn test_rebuilding_from_cache_is_identical() {
        let site = NewsSite::serve(vec![
            ("/news/one/a", 200, article_page("One")),
            ("/opinion/two/b", 200, article_page("Two")),
        ]);
        let dir = TempDir::new().unwrap();
        let urls = [site.url("/news/one/a"), site.url("/opinion/two/b")];

        let first_run = pipeline(dir.path());
        let mut first = Vec::new();
        for url in &urls {
            first.push(first_run.build(url).await);
        }

        let second_run = pipeline(dir.path());
        let mut second = Vec::new();
        for url in &urls {
            second.push(second_run.build(url).await);
        }

        assert_eq!(first, second);
        assert_eq!(second_run.stats().from_cache(), 2);
        assert_eq!(site.hits(), 2);
    }

    #[tokio::test]
    async fn test_articles_sharing_a_slug_keep_their_own_fields() {
        let site = NewsSite::serve(vec![
            ("/news/child-welfare/slug-123", 200, article_page("First")),
            ("/news/child-welfare/slug-456", 200, article_page("Second")),
        ]);
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());

        let first = pipeline.build(&site.url("/news/child-welfare/slug-123")).await;
        let second = pipeline.build(&site.url("/news/child-welfare/slug-456")).await;

        assert_eq!(first.title, "First");
        assert_eq!(second.title, "Second");
        assert_eq!(second.text, "Second opens.\nSecond closes.");
        assert_eq!(pipeline.stats().from_network(), 2);
    }

    #[tokio::test]
    async fn test_timed_out_fetch_gives_best_effort_record() {
        let base = unresponsive_site(Duration::from_secs(5));
        let dir = TempDir::new().unwrap();
        let cache =
            ArticleCache::new(dir.path(), HeaderMap::new(), Duration::from_secs(1), true, NoDelay)
                .unwrap();
        let pipeline = ArticlePipeline::new(cache, &DEFAULT_SELECTORS);
        let url = format!("{base}/opinion/slow/story");

        let record = pipeline.build(&url).await;
        assert_eq!(record, ArticleRecord::best_effort(&url, "opinion".into()));
        assert_eq!(pipeline.stats().failed(), 1);
    }
}
