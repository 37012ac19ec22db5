//! Article fetching and field extraction.
//!
//! - [`cache`]: cache-or-fetch access to raw article pages
//! - [`fields`]: independent extractors for title, date, author, tags and text
//! - [`pipeline`]: combines both into one [`crate::models::ArticleRecord`] per URL

pub mod cache;
pub mod fields;
pub mod pipeline;

pub use cache::ArticleCache;
pub use pipeline::ArticlePipeline;
