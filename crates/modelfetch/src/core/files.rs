//! File operation utilities
//!
//! Naming of downloaded archives plus the temp-file handling that keeps a
//! failed transfer from leaving a truncated archive under its final name.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::core::{DownloadError, FileOperation, Result};
use crate::resolver::format::ExportFormat;

/// Maximum number of characters kept from a model's display name
pub const MAX_NAME_CHARS: usize = 50;

/// Name used when sanitizing leaves nothing of the display name
const FALLBACK_NAME: &str = "model";

/// Strip everything but alphanumerics, whitespace, `-` and `_`, then truncate
pub fn sanitize_model_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .take(MAX_NAME_CHARS)
        .collect();

    if cleaned.trim().is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// Build the archive filename `<name>_<id>_<LABEL>.<format>.zip`
///
/// The model ID and format label keep differently formatted downloads of the
/// same or similarly named models apart.
pub fn model_filename(name: &str, model_id: &str, format: ExportFormat) -> String {
    format!(
        "{}_{}_{}.{}",
        sanitize_model_name(name),
        model_id,
        format.label(),
        format.extension()
    )
}

/// Create a temporary file path for in-flight downloads
///
/// Returns the destination with `.part` appended, so `x.fbx.zip` becomes
/// `x.fbx.zip.part` rather than replacing the `.zip` extension.
pub fn create_temp_path(dest_path: &Path) -> PathBuf {
    let mut name = dest_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest_path.with_file_name(name)
}

/// Atomically rename a temporary file to its final destination
pub async fn atomic_rename(temp_path: &Path, dest_path: &Path) -> Result<()> {
    fs::rename(temp_path, dest_path)
        .await
        .map_err(|e| DownloadError::file_system(dest_path, FileOperation::Move, e))?;
    debug!("Atomically renamed {} to {}", temp_path.display(), dest_path.display());
    Ok(())
}

/// Remove a leftover partial file, ignoring a file that is already gone
pub async fn remove_partial(temp_path: &Path) -> Result<()> {
    match fs::remove_file(temp_path).await {
        Ok(()) => {
            debug!("Removed partial file {}", temp_path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DownloadError::file_system(temp_path, FileOperation::Delete, e)),
    }
}

/// Size of an existing regular file, or `None` when nothing is there
pub async fn existing_file_size(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DownloadError::file_system(path, FileOperation::Metadata, e)),
    }
}
