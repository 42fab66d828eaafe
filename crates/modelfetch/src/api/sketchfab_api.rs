//! Sketchfab private API client
//!
//! This module handles the two calls needed per model:
//! - model metadata (`/i/models/{id}`): display name and the owner's download flag
//! - download locations (`/i/models/{id}/download`): one pre-signed link per format
//!
//! Responses are parsed into typed records at this boundary. Status codes with
//! a meaning of their own (401, 403, 404) become dedicated errors.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::auth::Credentials;
use crate::config::FetchConfig;
use crate::core::{DownloadError, HttpClient, Result};
use crate::resolver::format::FormatOffer;

fn unknown_name() -> String {
    "Unknown".to_string()
}

/// Model metadata response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelMetadata {
    #[serde(default = "unknown_name")]
    pub name: String,
    /// Whether the owner allows downloads
    #[serde(rename = "isDownloadable", default)]
    pub is_downloadable: bool,
}

/// Sketchfab API client bound to the run's session
#[derive(Debug, Clone)]
pub struct SketchfabApi {
    client: Client,
    credentials: Credentials,
    config: FetchConfig,
}

impl SketchfabApi {
    /// Create an API client sharing the session of `http`
    pub fn new(http: &HttpClient, credentials: Credentials, config: FetchConfig) -> Self {
        Self {
            client: http.client().clone(),
            credentials,
            config,
        }
    }

    /// Fetch a model's metadata
    pub async fn get_model(&self, model_id: &str) -> Result<ModelMetadata> {
        let url = self.config.metadata_url(model_id);
        self.get_json(model_id, &url).await
    }

    /// Fetch the download locations offered for a model
    pub async fn get_download_offer(&self, model_id: &str) -> Result<FormatOffer> {
        let url = self.config.download_url(model_id);
        self.get_json(model_id, &url).await
    }

    /// Inter-request pause for the informal rate limit
    pub fn request_delay(&self) -> Duration {
        self.config.request_delay
    }

    async fn get_json<T: DeserializeOwned>(&self, model_id: &str, url: &str) -> Result<T> {
        let request = self
            .credentials
            .authorize(self.client.get(url))
            .timeout(self.config.api_timeout);

        debug!("Sketchfab API request: GET {}", url);
        let response = request.send().await.map_err(|e| DownloadError::HttpRequest {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        debug!("Sketchfab API response: {} for {}", status, url);
        check_status(status, model_id, url)?;

        // Get the response text for better error messages
        let response_text = response.text().await.map_err(|e| DownloadError::HttpRequest {
            url: url.to_string(),
            source: e,
        })?;

        serde_json::from_str(&response_text).map_err(|e| DownloadError::InvalidResponse {
            url: url.to_string(),
            reason: format!("{} - Response was: {}", e, truncate(&response_text, 200)),
        })
    }
}

/// Map API status codes onto the failure taxonomy
fn check_status(status: StatusCode, model_id: &str, url: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    Err(match status {
        StatusCode::UNAUTHORIZED => DownloadError::AuthenticationRequired {
            model_id: model_id.to_string(),
        },
        StatusCode::FORBIDDEN => DownloadError::DownloadsDisabled {
            model_id: model_id.to_string(),
        },
        StatusCode::NOT_FOUND => DownloadError::NotFound {
            model_id: model_id.to_string(),
            url: url.to_string(),
        },
        other => DownloadError::UnexpectedStatus {
            url: url.to_string(),
            status: other.as_u16(),
        },
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
