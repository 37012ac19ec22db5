//! The link-list checkpoint.
//!
//! Its presence on disk means pagination already completed, and the next run
//! goes straight to fetching articles.

use crate::models::ArticleLink;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write one link per line, replacing any previous file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = links.len()))]
pub async fn write_links(path: &Path, links: &[ArticleLink]) -> Result<(), Box<dyn Error>> {
    let mut body = String::with_capacity(links.iter().map(|l| l.len() + 1).sum());
    for link in links {
        body.push_str(link);
        body.push('\n');
    }
    fs::write(path, body).await?;
    info!("Wrote article links");
    Ok(())
}

/// Read a link list, ignoring surrounding whitespace and blank lines.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_links(path: &Path) -> Result<Vec<ArticleLink>, Box<dyn Error>> {
    let body = fs::read_to_string(path).await?;
    let links: Vec<ArticleLink> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    info!(count = links.len(), "Loaded article links");
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_written_file_has_one_link_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.txt");
        let links = vec![
            "https://site.example/news/a/1".to_string(),
            "https://site.example/news/b/2".to_string(),
        ];

        write_links(&path, &links).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "https://site.example/news/a/1\nhttps://site.example/news/b/2\n");
        assert_eq!(read_links(&path).await.unwrap(), links);
    }

    #[tokio::test]
    async fn test_read_skips_blank_lines_and_crlf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(&path, "https://a.example/x/1\r\n\r\n  \nhttps://a.example/y/2").unwrap();

        assert_eq!(
            read_links(&path).await.unwrap(),
            vec!["https://a.example/x/1", "https://a.example/y/2"]
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_links(&dir.path().join("absent.txt")).await.is_err());
    }
}
