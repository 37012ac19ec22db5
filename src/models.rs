//! Data models for listing snapshots, cached documents and article records.
//!
//! This module defines the core data structures used throughout the harvest:
//! - [`ListingSnapshot`]: the article links visible on the listing page at one
//!   point of the pagination loop
//! - [`CachedDocument`]: raw article markup together with where it came from
//! - [`ArticleRecord`]: the structured row extracted from one article
//! - [`ArticleRow`]: the flattened CSV form of a record

use serde::{Deserialize, Serialize};
use std::fmt;

/// An absolute article URL, unique within one collection run.
pub type ArticleLink = String;

/// Column order of the output table.
pub const ARTICLE_COLUMNS: [&str; 7] = ["url", "title", "date", "author", "tags", "type", "text"];

/// Separator used when tags are flattened into a single cell.
pub const TAG_SEPARATOR: &str = ", ";

/// The article links captured from the listing page at one iteration.
///
/// Links keep their order of first appearance in the markup. The count is
/// always the number of links held.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingSnapshot {
    links: Vec<ArticleLink>,
}

impl ListingSnapshot {
    pub fn new(links: Vec<ArticleLink>) -> Self {
        Self { links }
    }

    pub fn count(&self) -> usize {
        self.links.len()
    }

    pub fn links(&self) -> &[ArticleLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<ArticleLink> {
        self.links
    }

    /// Whether `next` shows more articles than this snapshot.
    pub fn grew_into(&self, next: &ListingSnapshot) -> bool {
        next.count() > self.count()
    }
}

/// Where the markup of a [`CachedDocument`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Network,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Cache => f.write_str("cache"),
            Origin::Network => f.write_str("network"),
        }
    }
}

/// Raw article markup as returned by the article cache.
///
/// An empty `raw_markup` marks a failed fetch.
#[derive(Debug, Clone)]
pub struct CachedDocument {
    pub url: ArticleLink,
    pub raw_markup: String,
    pub origin: Origin,
}

impl CachedDocument {
    pub fn is_empty(&self) -> bool {
        self.raw_markup.is_empty()
    }
}

/// One harvested article.
///
/// `url` is always populated. Every other field falls back to its empty value
/// when it could not be fetched or extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub url: ArticleLink,
    pub title: String,
    pub date: String,
    pub author: String,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ArticleRecord {
    /// A record carrying only the URL-derived fields.
    pub fn best_effort(url: &str, kind: String) -> Self {
        Self {
            url: url.to_string(),
            kind,
            ..Self::default()
        }
    }

    pub fn as_row(&self) -> ArticleRow<'_> {
        ArticleRow {
            url: &self.url,
            title: &self.title,
            date: &self.date,
            author: &self.author,
            tags: self.tags.join(TAG_SEPARATOR),
            kind: &self.kind,
            text: &self.text,
        }
    }
}

/// Flattened table row; field order matches [`ARTICLE_COLUMNS`].
#[derive(Debug, Serialize)]
pub struct ArticleRow<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub date: &'a str,
    pub author: &'a str,
    pub tags: String,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub text: &'a str,
}
