//! Error types for the model fetcher with context and failure classification
//!
//! Every failure that can happen while processing a single model reference is
//! expressed as a [`DownloadError`]. The run loop never aborts on these; it maps
//! each error onto a [`FailureKind`] for the summary and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Comprehensive error type for resolving and downloading models
#[derive(Error, Debug)]
pub enum DownloadError {
    /// No model identifier could be extracted from the link
    #[error("Could not extract a model ID from '{url}'")]
    UnresolvableUrl {
        url: String,
    },

    /// The owner disabled downloads (metadata flag or 403 from the endpoint)
    #[error("Downloads are disabled by the owner of model {model_id}")]
    DownloadsDisabled {
        model_id: String,
    },

    /// The endpoint answered 401
    #[error("Authentication required for model {model_id} (token or cookies missing or invalid)")]
    AuthenticationRequired {
        model_id: String,
    },

    /// The endpoint answered 404
    #[error("Model {model_id} not found at '{url}'")]
    NotFound {
        model_id: String,
        url: String,
    },

    /// The offer lists no format we know how to pick
    #[error("No acceptable format for model {model_id} (available: {})", display_formats(.available))]
    NoAcceptableFormat {
        model_id: String,
        available: Vec<String>,
    },

    /// HTTP-related errors with context
    #[error("HTTP request to '{url}' failed: {source}")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a status we have no mapping for
    #[error("Unexpected HTTP status {status} from '{url}'")]
    UnexpectedStatus {
        url: String,
        status: u16,
    },

    /// The API body did not match the expected record
    #[error("Invalid response from '{url}': {reason}")]
    InvalidResponse {
        url: String,
        reason: String,
    },

    /// File system I/O errors with file context
    #[error("File operation failed on '{path}' while {operation}: {source}")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
        suggestion: Option<String>,
    },

    /// A browser cookie store could not be used
    #[error("Could not load cookies from {browser}: {reason}")]
    BrowserCookies {
        browser: String,
        reason: String,
    },

    /// Malformed cookie export
    #[error("Invalid cookie file '{path}' at line {line}: {reason}")]
    CookieFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

fn display_formats(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    Move,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Metadata => write!(f, "reading metadata"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

/// Failure taxonomy used for per-model outcomes and the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    UnresolvableUrl,
    DownloadsDisabled,
    AuthenticationRequired,
    NoAcceptableFormat,
    NotFound,
    TransferFailure,
    InvalidResponse,
}

impl FailureKind {
    /// Human-readable label for console output
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::UnresolvableUrl => "unresolvable URL",
            FailureKind::DownloadsDisabled => "downloads disabled",
            FailureKind::AuthenticationRequired => "authentication required",
            FailureKind::NoAcceptableFormat => "no acceptable format",
            FailureKind::NotFound => "not found",
            FailureKind::TransferFailure => "transfer failure",
            FailureKind::InvalidResponse => "invalid response",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl DownloadError {
    /// Classify this error into the failure taxonomy
    pub fn kind(&self) -> FailureKind {
        match self {
            DownloadError::UnresolvableUrl { .. } => FailureKind::UnresolvableUrl,
            DownloadError::DownloadsDisabled { .. } => FailureKind::DownloadsDisabled,
            DownloadError::AuthenticationRequired { .. } => FailureKind::AuthenticationRequired,
            DownloadError::NoAcceptableFormat { .. } => FailureKind::NoAcceptableFormat,
            DownloadError::NotFound { .. } => FailureKind::NotFound,
            DownloadError::HttpRequest { .. } => FailureKind::TransferFailure,
            DownloadError::FileSystem { .. } => FailureKind::TransferFailure,
            DownloadError::UnexpectedStatus { .. } => FailureKind::InvalidResponse,
            DownloadError::InvalidResponse { .. } => FailureKind::InvalidResponse,
            // Setup errors normally stop the CLI before the loop starts
            DownloadError::Configuration { .. } => FailureKind::InvalidResponse,
            DownloadError::CookieFile { .. } | DownloadError::BrowserCookies { .. } => {
                FailureKind::AuthenticationRequired
            }
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            DownloadError::UnresolvableUrl { .. } => "unresolvable_url",
            DownloadError::DownloadsDisabled { .. } => "downloads_disabled",
            DownloadError::AuthenticationRequired { .. } => "authentication_required",
            DownloadError::NotFound { .. } => "not_found",
            DownloadError::NoAcceptableFormat { .. } => "no_acceptable_format",
            DownloadError::HttpRequest { .. } => "http_request",
            DownloadError::UnexpectedStatus { .. } => "unexpected_status",
            DownloadError::InvalidResponse { .. } => "invalid_response",
            DownloadError::FileSystem { .. } => "file_system",
            DownloadError::Configuration { .. } => "configuration",
            DownloadError::CookieFile { .. } => "cookie_file",
            DownloadError::BrowserCookies { .. } => "browser_cookies",
        }
    }

    /// Get user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            DownloadError::AuthenticationRequired { .. } => {
                Some("Pass --token (or SKETCHFAB_API_TOKEN) or export fresh cookies after logging in")
            }
            DownloadError::UnresolvableUrl { .. } => {
                Some("Check the link; it should look like /3d-models/<name>-<32 hex id> or /models/<id>")
            }
            DownloadError::CookieFile { .. } => {
                Some("Export cookies in Netscape cookies.txt format")
            }
            DownloadError::BrowserCookies { .. } => {
                Some("Close the browser and retry, or export cookies.txt and pass --cookies")
            }
            DownloadError::Configuration { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    /// Build a file system error with context
    pub(crate) fn file_system(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        DownloadError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }
}
