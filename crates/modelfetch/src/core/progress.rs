//! Progress tracking and reporting for model downloads

use std::io::{self, Write};
use std::sync::Arc;

use crate::resolver::format::ExportFormat;

/// Progress callback for download operations
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Events emitted while resolving and downloading models
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    ModelStarted {
        index: usize,
        total: usize,
        url: String,
    },
    UrlRepaired {
        original: String,
        repaired: String,
    },
    ModelResolved {
        model_id: String,
        name: String,
    },
    FormatsOffered {
        model_id: String,
        formats: Vec<String>,
    },
    FormatSelected {
        model_id: String,
        format: ExportFormat,
    },
    DownloadStarted {
        url: String,
        total_size: Option<u64>,
    },
    DownloadProgress {
        url: String,
        downloaded: u64,
        total: Option<u64>,
        speed_bps: f64,
    },
    DownloadComplete {
        url: String,
        final_size: u64,
    },
    Warning {
        url: String,
        message: String,
    },
    Error {
        url: String,
        error: String,
    },
}

impl ProgressEvent {
    /// Completed fraction in `0.0..=1.0` for progress events with a known total
    pub fn fraction(&self) -> Option<f64> {
        match self {
            ProgressEvent::DownloadProgress { downloaded, total: Some(total), .. } if *total > 0 => {
                Some((*downloaded as f64 / *total as f64).min(1.0))
            }
            _ => None,
        }
    }
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_model_started(&self, _index: usize, _total: usize, _url: &str) {}
    fn on_url_repaired(&self, _original: &str, _repaired: &str) {}
    fn on_model_resolved(&self, _model_id: &str, _name: &str) {}
    fn on_formats_offered(&self, _model_id: &str, _formats: &[String]) {}
    fn on_format_selected(&self, _model_id: &str, _format: ExportFormat) {}
    fn on_download_started(&self, _url: &str, _total_size: Option<u64>) {}
    fn on_download_progress(&self, _url: &str, _downloaded: u64, _total: Option<u64>, _speed_bps: f64) {}
    fn on_download_complete(&self, _url: &str, _final_size: u64) {}
    fn on_warning(&self, _url: &str, _message: &str) {}
    fn on_error(&self, _url: &str, _error: &str) {}
}

/// Extension trait to convert ProgressReporter to ProgressCallback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event| match event {
            ProgressEvent::ModelStarted { index, total, url } => {
                self.on_model_started(index, total, &url);
            }
            ProgressEvent::UrlRepaired { original, repaired } => {
                self.on_url_repaired(&original, &repaired);
            }
            ProgressEvent::ModelResolved { model_id, name } => {
                self.on_model_resolved(&model_id, &name);
            }
            ProgressEvent::FormatsOffered { model_id, formats } => {
                self.on_formats_offered(&model_id, &formats);
            }
            ProgressEvent::FormatSelected { model_id, format } => {
                self.on_format_selected(&model_id, format);
            }
            ProgressEvent::DownloadStarted { url, total_size } => {
                self.on_download_started(&url, total_size);
            }
            ProgressEvent::DownloadProgress { url, downloaded, total, speed_bps } => {
                self.on_download_progress(&url, downloaded, total, speed_bps);
            }
            ProgressEvent::DownloadComplete { url, final_size } => {
                self.on_download_complete(&url, final_size);
            }
            ProgressEvent::Warning { url, message } => {
                self.on_warning(&url, &message);
            }
            ProgressEvent::Error { url, error } => {
                self.on_error(&url, &error);
            }
        })
    }
}

/// Console progress reporter: status lines per model and an in-place progress line
#[derive(Debug, Default)]
pub struct ConsoleProgressReporter {
    pub verbose: bool,
}

impl ConsoleProgressReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

const RULE_WIDTH: usize = 70;

impl ProgressReporter for ConsoleProgressReporter {
    fn on_model_started(&self, index: usize, total: usize, url: &str) {
        println!("\n{}", "=".repeat(RULE_WIDTH));
        println!("[{}/{}] {}", index, total, url);
        println!("{}", "=".repeat(RULE_WIDTH));
    }

    fn on_url_repaired(&self, _original: &str, repaired: &str) {
        println!("🔧 Fixed malformed URL: {}", repaired);
    }

    fn on_model_resolved(&self, model_id: &str, name: &str) {
        println!("📦 Model ID: {}", model_id);
        println!("📝 Name: {}", name);
    }

    fn on_formats_offered(&self, _model_id: &str, formats: &[String]) {
        let upper: Vec<String> = formats.iter().map(|f| f.to_uppercase()).collect();
        println!("📋 Available formats: {}", upper.join(", "));
    }

    fn on_format_selected(&self, _model_id: &str, format: ExportFormat) {
        println!("🎯 Selected format: {}", format.label());
    }

    fn on_download_started(&self, url: &str, total_size: Option<u64>) {
        if self.verbose {
            match total_size {
                Some(size) => println!("⬇️  Downloading {} ({} bytes)", url, size),
                None => println!("⬇️  Downloading {}", url),
            }
        } else {
            println!("⬇️  Downloading...");
        }
    }

    fn on_download_progress(&self, _url: &str, downloaded: u64, total: Option<u64>, _speed_bps: f64) {
        let downloaded_mb = downloaded as f64 / 1_048_576.0;
        match total {
            Some(total) if total > 0 => {
                let percent = (downloaded as f64 / total as f64) * 100.0;
                print!("\r   Progress: {:.1}% ({:.1} MB)", percent, downloaded_mb);
            }
            _ => print!("\r   Downloaded: {:.1} MB", downloaded_mb),
        }
        let _ = io::stdout().flush();
    }

    fn on_download_complete(&self, _url: &str, final_size: u64) {
        println!("\n✅ Saved ({:.2} MB)", final_size as f64 / 1_048_576.0);
    }

    fn on_warning(&self, _url: &str, message: &str) {
        println!("⚠️  {}", message);
    }

    fn on_error(&self, _url: &str, error: &str) {
        eprintln!("❌ {}", error);
    }
}

/// Null progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingReporter {
        completes: Mutex<Vec<u64>>,
        selected: Mutex<Vec<ExportFormat>>,
    }

    impl ProgressReporter for Arc<CountingReporter> {
        fn on_download_complete(&self, _url: &str, final_size: u64) {
            self.completes.lock().unwrap().push(final_size);
        }

        fn on_format_selected(&self, _model_id: &str, format: ExportFormat) {
            self.selected.lock().unwrap().push(format);
        }
    }

    #[test]
    fn test_into_callback_dispatches() {
        let reporter = Arc::new(CountingReporter::default());
        let callback = reporter.clone().into_callback();

        callback(ProgressEvent::FormatSelected { model_id: "m".to_string(), format: ExportFormat::Obj });
        callback(ProgressEvent::DownloadComplete { url: "u".to_string(), final_size: 42 });
        callback(ProgressEvent::Warning { url: "u".to_string(), message: "ignored".to_string() });

        assert_eq!(*reporter.completes.lock().unwrap(), vec![42]);
        assert_eq!(*reporter.selected.lock().unwrap(), vec![ExportFormat::Obj]);
    }

    #[test]
    fn test_fraction() {
        let event = ProgressEvent::DownloadProgress {
            url: "u".to_string(),
            downloaded: 512,
            total: Some(1024),
            speed_bps: 0.0,
        };
        assert_eq!(event.fraction(), Some(0.5));

        let unknown = ProgressEvent::DownloadProgress {
            url: "u".to_string(),
            downloaded: 512,
            total: None,
            speed_bps: 0.0,
        };
        assert_eq!(unknown.fraction(), None);

        let other = ProgressEvent::DownloadComplete { url: "u".to_string(), final_size: 1 };
        assert_eq!(other.fraction(), None);
    }

    #[test]
    fn test_null_reporter_accepts_everything() {
        let callback = NullProgressReporter.into_callback();
        callback(ProgressEvent::Error { url: "u".to_string(), error: "boom".to_string() });
    }
}
