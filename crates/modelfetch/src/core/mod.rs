//! Core types used throughout the fetcher
//!
//! Errors, progress events, file naming and the streaming HTTP transfer. The
//! resolver and runner are built on top of these.

pub mod error;
pub mod files;
pub mod http;
pub mod progress;

// Re-export main types for convenience
pub use error::{DownloadError, FailureKind, FileOperation, Result};
pub use files::{model_filename, sanitize_model_name};
pub use http::HttpClient;
pub use progress::{
    ConsoleProgressReporter, IntoProgressCallback, NullProgressReporter, ProgressCallback,
    ProgressEvent, ProgressReporter,
};

use std::path::PathBuf;

use crate::resolver::format::ExportFormat;

/// Outcome of processing one model reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    /// Archive was downloaded and saved
    Downloaded {
        path: PathBuf,
        size: u64,
        format: ExportFormat,
    },
    /// Archive was already on disk and overwriting is off
    AlreadyExists {
        path: PathBuf,
        size: u64,
        format: ExportFormat,
    },
    /// Model was skipped
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl DownloadResult {
    /// Convert a per-model error into a recorded failure
    pub fn from_error(error: &DownloadError) -> Self {
        DownloadResult::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Saved file, for successful outcomes
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            DownloadResult::Downloaded { path, .. } | DownloadResult::AlreadyExists { path, .. } => Some(path),
            DownloadResult::Failed { .. } => None,
        }
    }
}
