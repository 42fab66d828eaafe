//! Sequential run loop and run statistics

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::core::{DownloadResult, FailureKind, ProgressEvent};
use crate::resolver::Resolver;

/// Statistics for a finished run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub attempted: u64,
    pub successful: u64,
    pub already_present: u64,
    pub failed: u64,
    pub failures: BTreeMap<FailureKind, u64>,
    /// Bytes transferred in this run (skipped archives are not counted)
    pub total_bytes: u64,
    /// Absolute path of the output directory
    pub output_dir: PathBuf,
    /// Outcome per link, in processing order
    pub outcomes: Vec<(String, DownloadResult)>,
    pub duration: Duration,
}

impl RunSummary {
    fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Self::default()
        }
    }

    /// Record the outcome of one link
    pub fn record(&mut self, url: &str, result: DownloadResult) {
        self.attempted += 1;
        match &result {
            DownloadResult::Downloaded { size, .. } => {
                self.successful += 1;
                self.total_bytes += size;
            }
            DownloadResult::AlreadyExists { .. } => {
                self.already_present += 1;
            }
            DownloadResult::Failed { kind, .. } => {
                self.failed += 1;
                *self.failures.entry(*kind).or_insert(0) += 1;
            }
        }
        self.outcomes.push((url.to_string(), result));
    }

    /// Number of failures of one kind
    pub fn failures_of(&self, kind: FailureKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Fraction of attempted links that ended with the archive on disk
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            (self.successful + self.already_present) as f64 / self.attempted as f64
        }
    }
}

/// Processes links one after another with a pause in between
#[derive(Debug)]
pub struct Runner {
    resolver: Resolver,
}

impl Runner {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    /// Process every link in order
    ///
    /// Per-model failures are recorded and the loop moves on. The configured
    /// request delay is applied between links, not after the last one.
    pub async fn run(&self, references: &[String]) -> RunSummary {
        let config = self.resolver.config();
        let output_dir = std::path::absolute(&config.output_dir).unwrap_or_else(|_| config.output_dir.clone());
        let mut summary = RunSummary::new(output_dir);
        let start = Instant::now();
        let total = references.len();

        info!("Processing {} model link(s)", total);

        for (index, url) in references.iter().enumerate() {
            if let Some(callback) = self.resolver.progress() {
                callback(ProgressEvent::ModelStarted {
                    index: index + 1,
                    total,
                    url: url.clone(),
                });
            }

            let result = match self.resolver.fetch(url).await {
                Ok(result) => result,
                Err(e) => {
                    info!(category = e.category(), "[{}/{}] {} failed ({}): {}", index + 1, total, url, e.kind(), e);
                    if let Some(callback) = self.resolver.progress() {
                        let error = match e.suggestion() {
                            Some(hint) => format!("{}\n   💡 {}", e, hint),
                            None => e.to_string(),
                        };
                        callback(ProgressEvent::Error { url: url.clone(), error });
                    }
                    DownloadResult::from_error(&e)
                }
            };
            summary.record(url, result);

            if index + 1 < total {
                tokio::time::sleep(config.request_delay).await;
            }
        }

        summary.duration = start.elapsed();
        info!(
            "Run finished: {} downloaded, {} already present, {} failed in {:.1}s",
            summary.successful,
            summary.already_present,
            summary.failed,
            summary.duration.as_secs_f64()
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::config::FetchConfig;
    use crate::core::ProgressCallback;
    use crate::resolver::ExportFormat;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GOOD_ID: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const LOCKED_ID: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::default();
        summary.record(
            "a",
            DownloadResult::Downloaded {
                path: PathBuf::from("a.fbx.zip"),
                size: 100,
                format: ExportFormat::Fbx,
            },
        );
        summary.record(
            "b",
            DownloadResult::AlreadyExists {
                path: PathBuf::from("b.obj.zip"),
                size: 50,
                format: ExportFormat::Obj,
            },
        );
        summary.record(
            "c",
            DownloadResult::Failed {
                kind: FailureKind::NotFound,
                message: "gone".to_string(),
            },
        );

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.already_present, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_bytes, 100);
        assert_eq!(summary.failures_of(FailureKind::NotFound), 1);
        assert_eq!(summary.failures_of(FailureKind::TransferFailure), 0);
        assert!((summary.success_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_run_continues_after_failures() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path(format!("/i/models/{}", GOOD_ID)))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"name": "Bed Rail", "isDownloadable": true}"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/i/models/{}/download", GOOD_ID)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"{{"gltf": {{"url": "{}/cdn/bed.zip"}}}}"#, server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cdn/bed.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 300]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/i/models/{}", LOCKED_ID)))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let started = Arc::new(Mutex::new(Vec::new()));
        let sink = started.clone();
        let callback: ProgressCallback = Arc::new(move |event| {
            if let ProgressEvent::ModelStarted { index, total, .. } = event {
                sink.lock().unwrap().push((index, total));
            }
        });

        let config = FetchConfig::default()
            .with_api_base(server.uri())
            .with_output_dir(dir.path())
            .with_request_delay(Duration::ZERO);
        let resolver = Resolver::new(config, Credentials::Anonymous)
            .unwrap()
            .with_progress(callback);

        let references = vec![
            "https://sketchfab.com/3d-models/nothing-to-see".to_string(),
            format!("https://sketchfab.com/3d-models/locked-{}", LOCKED_ID),
            format!("https://sketchfab.com/3d-models/bed-rail-{}", GOOD_ID),
        ];
        let summary = Runner::new(resolver).run(&references).await;

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total_bytes, 300);
        assert_eq!(summary.failures_of(FailureKind::UnresolvableUrl), 1);
        assert_eq!(summary.failures_of(FailureKind::DownloadsDisabled), 1);
        assert!(summary.output_dir.is_absolute());
        assert_eq!(*started.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);

        let (last_url, last) = summary.outcomes.last().unwrap();
        assert_eq!(last_url, &references[2]);
        assert_eq!(
            last.path(),
            Some(&dir.path().join(format!("Bed Rail_{}_GLTF.gltf.zip", GOOD_ID)))
        );
    }

    #[tokio::test]
    async fn test_run_with_no_references() {
        let dir = tempdir().unwrap();
        let config = FetchConfig::default().with_output_dir(dir.path());
        let resolver = Resolver::new(config, Credentials::Anonymous).unwrap();

        let summary = Runner::new(resolver).run(&[]).await;
        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.success_rate(), 0.0);
    }
}
