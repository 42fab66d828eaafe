//! Model resolution
//!
//! Turns one model link into a saved archive:
//! normalize -> metadata -> delay -> download locations -> select -> transfer.
//! Every step that can fail returns a [`DownloadError`] whose
//! [`kind`](DownloadError::kind) is recorded by the runner.

pub mod format;
pub mod url;

pub use format::{ExportFormat, FormatLink, FormatOffer, SelectedFormat, select};
pub use url::{ModelReference, extract_id, normalize};

use tracing::{debug, info};

use crate::api::SketchfabApi;
use crate::auth::Credentials;
use crate::config::FetchConfig;
use crate::core::files::existing_file_size;
use crate::core::{
    DownloadError, DownloadResult, HttpClient, ProgressCallback, ProgressEvent, Result, model_filename,
};

/// Resolves model links and downloads the preferred export of each
#[derive(Clone)]
pub struct Resolver {
    http: HttpClient,
    api: SketchfabApi,
    config: FetchConfig,
    progress: Option<ProgressCallback>,
}

impl Resolver {
    /// Build the HTTP session and API client for a run
    pub fn new(config: FetchConfig, credentials: Credentials) -> Result<Self> {
        let http = HttpClient::from_config(&config, &credentials)?;
        let api = SketchfabApi::new(&http, credentials, config.clone());
        Ok(Self {
            http,
            api,
            config,
            progress: None,
        })
    }

    /// Report progress events to `callback`
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub(crate) fn progress(&self) -> Option<&ProgressCallback> {
        self.progress.as_ref()
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }

    /// Process one model link
    ///
    /// Returns `Downloaded` or `AlreadyExists` on success. Any error is
    /// specific to this model and leaves the session usable for the next one.
    pub async fn fetch(&self, raw_url: &str) -> Result<DownloadResult> {
        let reference = ModelReference::parse(raw_url)?;
        if reference.was_repaired() {
            debug!("Repaired link {} -> {}", reference.raw, reference.url);
            self.emit(ProgressEvent::UrlRepaired {
                original: reference.raw.clone(),
                repaired: reference.url.clone(),
            });
        }

        let model_id = reference.model_id.as_str();
        let metadata = self.api.get_model(model_id).await?;
        self.emit(ProgressEvent::ModelResolved {
            model_id: model_id.to_string(),
            name: metadata.name.clone(),
        });

        if !metadata.is_downloadable {
            return Err(DownloadError::DownloadsDisabled {
                model_id: model_id.to_string(),
            });
        }

        tokio::time::sleep(self.api.request_delay()).await;

        let offer = self.api.get_download_offer(model_id).await?;
        let available = offer.available();
        if !offer.is_empty() {
            self.emit(ProgressEvent::FormatsOffered {
                model_id: model_id.to_string(),
                formats: available.clone(),
            });
        }

        let selected = select(&offer).ok_or_else(|| DownloadError::NoAcceptableFormat {
            model_id: model_id.to_string(),
            available,
        })?;
        self.emit(ProgressEvent::FormatSelected {
            model_id: model_id.to_string(),
            format: selected.format,
        });

        let dest_path = self
            .config
            .output_dir
            .join(model_filename(&metadata.name, model_id, selected.format));

        if !self.config.overwrite_existing {
            if let Some(size) = existing_file_size(&dest_path).await? {
                info!("Skipping {}: {} already exists", model_id, dest_path.display());
                self.emit(ProgressEvent::Warning {
                    url: reference.url.clone(),
                    message: format!("Already downloaded: {}", dest_path.display()),
                });
                return Ok(DownloadResult::AlreadyExists {
                    path: dest_path,
                    size,
                    format: selected.format,
                });
            }
        }

        let size = self
            .http
            .download_to_file(&selected.url, &dest_path, selected.size, self.progress.clone())
            .await?;

        info!("Saved {} ({} bytes) as {}", model_id, size, dest_path.display());
        Ok(DownloadResult::Downloaded {
            path: dest_path,
            size,
            format: selected.format,
        })
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}
