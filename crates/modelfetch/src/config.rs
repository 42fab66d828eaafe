//! Configuration types for the model fetcher

use std::path::PathBuf;
use std::time::Duration;

/// Default marketplace origin for the private API
pub const DEFAULT_API_BASE: &str = "https://sketchfab.com";

/// Configuration for a fetch run
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin the `/i/models/...` endpoints are resolved against
    pub api_base: String,
    /// Directory archives are written to (created on demand)
    pub output_dir: PathBuf,
    /// Pause before the download-location call and between models
    pub request_delay: Duration,
    /// Timeout for the small JSON API calls
    pub api_timeout: Duration,
    /// Connect timeout for every request, including asset transfers
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Largest slice written to disk (and reported) at a time
    pub chunk_size: usize,
    /// Re-download even when the target archive already exists
    pub overwrite_existing: bool,
}

impl FetchConfig {
    /// Set the output directory
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Override the API origin (mock servers in tests, mirrors)
    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the delay inserted between API calls
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Set the transfer chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Allow replacing archives that are already on disk
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    /// Metadata endpoint for a model
    pub fn metadata_url(&self, model_id: &str) -> String {
        format!("{}/i/models/{}", self.api_base.trim_end_matches('/'), model_id)
    }

    /// Download-location endpoint for a model
    pub fn download_url(&self, model_id: &str) -> String {
        format!("{}/i/models/{}/download", self.api_base.trim_end_matches('/'), model_id)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            output_dir: PathBuf::from("sketchfab_models"),
            request_delay: Duration::from_secs(2),
            api_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(15),
            user_agent: format!("modelfetch/{}", env!("CARGO_PKG_VERSION")),
            chunk_size: 8 * 1024, // 8 KiB
            overwrite_existing: false,
        }
    }
}
