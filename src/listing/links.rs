//! Article preview links from listing-page markup.

use crate::models::{ArticleLink, ListingSnapshot};
use itertools::Itertools;
use scraper::{Html, Selector};
use tracing::trace;
use url::Url;

/// Extract the article links shown on a listing page.
///
/// Anchors matching `preview_link` are resolved against `base` and returned
/// once each, in document order. Anchors without a usable `href` are skipped.
/// Malformed or empty markup simply yields an empty snapshot.
pub fn extract_article_links(markup: &str, base: &Url, preview_link: &Selector) -> ListingSnapshot {
    let document = Html::parse_document(markup);
    let links: Vec<ArticleLink> = document
        .select(preview_link)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .unique()
        .collect();
    trace!(count = links.len(), "Extracted preview links");
    ListingSnapshot::new(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SELECTORS;

    fn base() -> Url {
        Url::parse("https://site.example/topic/child-welfare-2").unwrap()
    }

    fn extract(markup: &str) -> ListingSnapshot {
        extract_article_links(markup, &base(), &DEFAULT_SELECTORS.preview_link)
    }

    const LISTING: &str = r#"
        <html><body>
          <div class="previews">
            <a class="article-preview-link" href="https://site.example/news/child-welfare/first-1">First</a>
            <a class="nav" href="https://site.example/about">About</a>
            <a class="article-preview-link featured" href="/news/child-welfare/second-2">Second</a>
            <a class="article-preview-link" href="https://site.example/news/child-welfare/first-1#comments">First again</a>
            <a class="article-preview-link">No href</a>
            <a class="article-preview-link" href="mailto:tips@site.example">Tips</a>
            <a class="article-preview-link" href="https://site.example/opinion/courts/third-3">Third</a>
          </div>
        </body></html>"#;

    #[test]
    fn test_extracts_preview_links_in_document_order() {
        let snapshot = extract(LISTING);
        assert_eq!(
            snapshot.links(),
            &[
                "https://site.example/news/child-welfare/first-1".to_string(),
                "https://site.example/news/child-welfare/second-2".to_string(),
                "https://site.example/opinion/courts/third-3".to_string(),
            ]
        );
        assert_eq!(snapshot.count(), 3);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        assert_eq!(extract(LISTING), extract(LISTING));
    }

    #[test]
    fn test_empty_and_garbage_markup_yield_nothing() {
        assert_eq!(extract("").count(), 0);
        assert_eq!(extract("<<<>>> <a class=").count(), 0);
        assert_eq!(extract("\u{0}\u{1}not html at all").count(), 0);
    }
}
