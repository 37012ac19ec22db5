//! CSV table of harvested articles.

use crate::models::{ARTICLE_COLUMNS, ArticleRecord};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Render records as CSV with a header row, in the given order.
pub fn to_csv(records: &[ArticleRecord]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(ARTICLE_COLUMNS)?;
    for record in records {
        writer.serialize(record.as_row())?;
    }
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

#[instrument(level = "info", skip_all, fields(path = %path.display(), rows = records.len()))]
pub async fn write_table(path: &Path, records: &[ArticleRecord]) -> Result<(), Box<dyn Error>> {
    let bytes = to_csv(records)?;
    fs::write(path, bytes).await?;
    info!("Saved article table");
    Ok(())
}
