//! JSON export of the harvested records.
//!
//! ```json
//! { "harvested_at": "2024-05-01T12:00:00+00:00", "source": "https://...", "articles": [ ... ] }
//! ```

use crate::models::ArticleRecord;
use chrono::Utc;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
pub struct Export<'a> {
    pub harvested_at: String,
    pub source: &'a str,
    pub articles: &'a [ArticleRecord],
}

impl<'a> Export<'a> {
    pub fn now(source: &'a str, articles: &'a [ArticleRecord]) -> Self {
        Self {
            harvested_at: Utc::now().to_rfc3339(),
            source,
            articles,
        }
    }
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_export(path: &Path, export: &Export<'_>) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(export)?;
    fs::write(path, json).await?;
    info!(articles = export.articles.len(), "Wrote JSON export");
    Ok(())
}
