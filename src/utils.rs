//! File system checks run before any network work.
//!
//! A harvest can spend hours paging through a listing; discovering only at
//! the end that the output location is read-only would throw that away. These
//! helpers create the needed directories and probe them with a throwaway file.

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| format!("cannot create directory {}: {e}", path.display()))?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"")
        .await
        .map_err(|e| format!("directory {} is not writable: {e}", path.display()))?;
    let _ = fs::remove_file(&probe_path).await;
    debug!("Directory is writable");
    Ok(())
}

/// Ensure the directory that will hold `file` is writable.
pub async fn ensure_writable_parent(file: &Path) -> Result<(), Box<dyn Error>> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_writable_dir(parent).await,
        _ => ensure_writable_dir(Path::new(".")).await,
    }
}
