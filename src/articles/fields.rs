//! Field extractors for a parsed article page.
//!
//! Each extractor looks up its own selector and either returns a value or
//! [`FieldError::NotFound`]. They share nothing but the parsed document, so
//! one missing element never affects another field; the pipeline maps a
//! failure to the field's empty default.
//!
//! The article `type` and the cache slug are not read from the page at all.
//! They are fixed path segments of the article URL; the cache key adds a
//! digest of the full URL so articles sharing a slug never share a file.

use crate::config::CompiledSelectors;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("no element for `{0}`")]
    NotFound(&'static str),
}

/// Path segment holding the article type, e.g. `news` in `/news/topic/slug`.
const TYPE_SEGMENT: usize = 0;
/// Path segment used to name the cache file.
const SLUG_SEGMENT: usize = 1;
/// Hex digits of the URL digest appended to the slug.
const KEY_DIGEST_LEN: usize = 12;

static UNSAFE_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

fn first<'a>(
    document: &'a Html,
    selector: &Selector,
    field: &'static str,
) -> Result<ElementRef<'a>, FieldError> {
    document
        .select(selector)
        .next()
        .ok_or(FieldError::NotFound(field))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Text of the first top-level heading.
pub fn title(document: &Html, selectors: &CompiledSelectors) -> Result<String, FieldError> {
    first(document, &selectors.title, "title").map(|h| text_of(h).trim().to_string())
}

/// Text of the publication date marker.
pub fn date(document: &Html, selectors: &CompiledSelectors) -> Result<String, FieldError> {
    first(document, &selectors.date, "date").map(|d| text_of(d).trim().to_string())
}

/// Text of the byline, without a leading `"By "`.
pub fn author(document: &Html, selectors: &CompiledSelectors) -> Result<String, FieldError> {
    let byline = text_of(first(document, &selectors.author, "author")?);
    let byline = byline.trim();
    Ok(byline
        .strip_prefix("By ")
        .unwrap_or(byline)
        .trim()
        .to_string())
}

/// Text of each tag link inside the tags container.
pub fn tags(document: &Html, selectors: &CompiledSelectors) -> Result<Vec<String>, FieldError> {
    let container = first(document, &selectors.tags_container, "tags")?;
    Ok(container
        .select(&selectors.tag_link)
        .map(|a| text_of(a).trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect())
}

/// Paragraphs of the article body joined by newlines.
pub fn text(document: &Html, selectors: &CompiledSelectors) -> Result<String, FieldError> {
    let content = first(document, &selectors.content, "text")?;
    Ok(content
        .select(&selectors.paragraph)
        .map(text_of)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// The `index`-th non-empty path segment of `url`.
fn path_segment(url: &str, index: usize) -> Option<String> {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()?
            .filter(|s| !s.is_empty())
            .nth(index)
            .map(str::to_string),
        // Unparseable links still split like `scheme://host/a/b`.
        Err(_) => url
            .split('/')
            .nth(3 + index)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    }
}

/// Article type derived from the URL alone.
///
/// `https://site.example/news/child-welfare/slug-123` has type `news`.
pub fn article_type(url: &str) -> String {
    path_segment(url, TYPE_SEGMENT).unwrap_or_default()
}

/// Filesystem-safe, human-readable slug for `url`.
///
/// Uses the second path segment; URLs without one fall back to their whole
/// host and path.
pub fn cache_slug(url: &str) -> String {
    let raw = path_segment(url, SLUG_SEGMENT).unwrap_or_else(|| {
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        without_scheme.trim_end_matches('/').to_string()
    });
    let slug = UNSAFE_SLUG_CHARS.replace_all(&raw, "_");
    let slug = slug.trim_matches('.');
    if slug.is_empty() {
        "index".to_string()
    } else {
        slug.to_string()
    }
}

/// Cache file stem for `url`: the readable slug plus a short SHA-256 digest
/// of the whole URL.
///
/// `/news/child-welfare/slug-123` and `/news/child-welfare/slug-456` share the
/// slug `child-welfare` but get different keys.
pub fn cache_key(url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}-{}", cache_slug(url), &digest[..KEY_DIGEST_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SELECTORS;

    const ARTICLE: &str = r#"
        <html><body>
          <h1> Judge Orders Review of Foster Placements </h1>
          <span class="pf-date">March 3, 2023</span>
          <author>By Jane Reporter</author>
          <div class="article-tags">
            <a href="/tag/foster-care">Foster Care</a>
            <a href="/tag/courts">Courts</a>
            <a href="/tag/empty"> </a>
          </div>
          <div class="article-content">
            <p>The first paragraph.</p>
            <p>The <em>second</em> paragraph.</p>
          </div>
          <p>Footer paragraph outside the article.</p>
        </body></html>"#;

    fn parse(markup: &str) -> Html {
        Html::parse_document(markup)
    }

    #[test]
    fn test_extracts_every_field() {
        let doc = parse(ARTICLE);
        let s = &*DEFAULT_SELECTORS;
        assert_eq!(title(&doc, s).unwrap(), "Judge Orders Review of Foster Placements");
        assert_eq!(date(&doc, s).unwrap(), "March 3, 2023");
        assert_eq!(author(&doc, s).unwrap(), "Jane Reporter");
        assert_eq!(tags(&doc, s).unwrap(), vec!["Foster Care", "Courts"]);
        assert_eq!(
            text(&doc, s).unwrap(),
            "The first paragraph.\nThe second paragraph."
        );
    }

    #[test]
    fn test_author_only_strips_literal_prefix() {
        let s = &*DEFAULT_SELECTORS;
        let doc = parse("<author>Bybee Young</author>");
        assert_eq!(author(&doc, s).unwrap(), "Bybee Young");
        let doc = parse("<author>  By  Sam Byrne </author>");
        assert_eq!(author(&doc, s).unwrap(), "Sam Byrne");
    }

    #[test]
    fn test_missing_elements_are_reported_per_field() {
        let doc = parse("<html><body><h1>Only a title</h1></body></html>");
        let s = &*DEFAULT_SELECTORS;
        assert_eq!(title(&doc, s).unwrap(), "Only a title");
        assert_eq!(date(&doc, s), Err(FieldError::NotFound("date")));
        assert_eq!(author(&doc, s), Err(FieldError::NotFound("author")));
        assert_eq!(tags(&doc, s), Err(FieldError::NotFound("tags")));
        assert_eq!(text(&doc, s), Err(FieldError::NotFound("text")));
    }

    #[test]
    fn test_empty_content_container_yields_empty_text() {
        let doc = parse(r#"<div class="article-content"><div>no paragraphs</div></div>"#);
        assert_eq!(text(&doc, &DEFAULT_SELECTORS).unwrap(), "");
    }

    #[test]
    fn test_article_type_comes_from_url() {
        assert_eq!(
            article_type("https://site.example/news/child-welfare/slug-123"),
            "news"
        );
        assert_eq!(article_type("https://site.example/opinion/x"), "opinion");
        assert_eq!(article_type("https://site.example/"), "");
        assert_eq!(article_type("not a url/at/all/really"), "really");
    }

    #[test]
    fn test_cache_slug() {
        assert_eq!(
            cache_slug("https://imprintnews.org/child-welfare/foster-youth-bill/12345"),
            "foster-youth-bill"
        );
        assert_eq!(cache_slug("https://site.example/news/a b?c"), "a_20b");
        assert_eq!(cache_slug("https://site.example/about"), "site.example_about");
        assert_eq!(cache_slug("https://site.example/"), "site.example");
    }

    #[test]
    fn test_cache_key_is_unique_per_url() {
        let a = cache_key("https://site.example/news/child-welfare/slug-123");
        let b = cache_key("https://site.example/news/child-welfare/slug-456");
        assert_ne!(a, b);
        assert!(a.starts_with("child-welfare-"));
        assert_eq!(a.len(), "child-welfare-".len() + KEY_DIGEST_LEN);
        assert_eq!(a, cache_key("https://site.example/news/child-welfare/slug-123"));
    }
}
