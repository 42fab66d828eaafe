//! Modelfetch Library
//!
//! Downloads 3D model archives from the Sketchfab marketplace. Each model link
//! is normalized, checked against the owner's download flag, and the best
//! available export (FBX > OBJ > GLTF > USDZ > SOURCE) is streamed to disk.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use modelfetch::{
//!     ConsoleProgressReporter, Credentials, FetchConfig, IntoProgressCallback,
//!     Resolver, Runner,
//! };
//!
//! # async fn example() -> modelfetch::Result<()> {
//! let config = FetchConfig::default().with_output_dir("models");
//! let credentials = Credentials::resolve(Some("my-api-token"), None, &config.api_base)?;
//!
//! let resolver = Resolver::new(config, credentials)?
//!     .with_progress(ConsoleProgressReporter::new(false).into_callback());
//!
//! let links = vec!["https://sketchfab.com/3d-models/infusion-pump-678e23f86b4a464b8d3ae88f2ab53124".to_string()];
//! let summary = Runner::new(resolver).run(&links).await;
//! println!("{} downloaded, {} failed", summary.successful, summary.failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Link repair**: restores the missing hyphen between slug and model ID
//! - **Typed API records**: metadata and download offers are validated on arrival
//! - **Format priority**: deterministic choice among the offered exports
//! - **Streaming transfer**: bounded chunks, progress events, `.part` temp files
//! - **Session credentials**: API token, a local browser's cookies, or a `cookies.txt` export

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod input;
pub mod resolver;
pub mod runner;

// Re-export commonly used types for convenience
pub use api::{ModelMetadata, SketchfabApi};
pub use auth::{Browser, CookieSource, Credentials};
pub use config::{DEFAULT_API_BASE, FetchConfig};
pub use core::{
    ConsoleProgressReporter, DownloadError, DownloadResult, FailureKind, HttpClient, IntoProgressCallback,
    NullProgressReporter, ProgressCallback, ProgressEvent, ProgressReporter, Result,
};
pub use input::{InputSource, TextFileSource, UrlListSource, collect_references};
pub use resolver::{ExportFormat, FormatOffer, ModelReference, Resolver, SelectedFormat, extract_id, normalize, select};
pub use runner::{RunSummary, Runner};
