//! HTTP utilities
//!
//! One reqwest client per run, carrying the session credentials, plus the
//! streaming transfer that writes a model archive to disk.

use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::files::{atomic_rename, create_temp_path, remove_partial};
use crate::auth::Credentials;
use crate::config::FetchConfig;
use crate::core::{DownloadError, FileOperation, ProgressCallback, ProgressEvent, Result};

/// HTTP client with integrated download functionality
///
/// It handles:
/// - client configuration (user agent, connect timeout, cookie jar)
/// - streaming downloads in bounded chunks with progress events
/// - `.part` temp files that are renamed on success and removed on failure
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    chunk_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client from the fetch configuration and session credentials
    pub fn from_config(config: &FetchConfig, credentials: &Credentials) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);

        if let Some(jar) = credentials.cookie_jar() {
            builder = builder.cookie_provider(jar);
        }

        let client = builder.build().map_err(|e| DownloadError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
            field: None,
            suggestion: None,
        })?;

        Ok(Self {
            client,
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Underlying reqwest client, shared with the API layer
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Stream `url` into `dest_path`, returning the size of the saved file
    ///
    /// The body is written in slices of at most `chunk_size` bytes to
    /// `<dest>.part`. After each slice a progress event is emitted; when the
    /// total is known it reaches 100% exactly once, on the last slice. On
    /// success the temp file is renamed into place and the final size is read
    /// back from disk. On failure the temp file is removed.
    pub async fn download_to_file(
        &self,
        url: &str,
        dest_path: &Path,
        expected_size: Option<u64>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<u64> {
        debug!("Stream downloading: {} to {}", url, dest_path.display());

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::file_system(parent, FileOperation::CreateDir, e))?;
        }

        let temp_path = create_temp_path(dest_path);

        let written = match self
            .stream_to_temp(url, &temp_path, expected_size, progress_callback.as_ref())
            .await
        {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = remove_partial(&temp_path).await {
                    warn!("Could not remove partial download {}: {}", temp_path.display(), cleanup);
                }
                return Err(e);
            }
        };

        atomic_rename(&temp_path, dest_path).await?;

        // Report the size that actually landed on disk
        let final_size = fs::metadata(dest_path)
            .await
            .map_err(|e| DownloadError::file_system(dest_path, FileOperation::Metadata, e))?
            .len();

        if final_size != written {
            warn!(
                "Size on disk ({} bytes) differs from bytes written ({} bytes) for {}",
                final_size,
                written,
                dest_path.display()
            );
        }

        if let Some(callback) = progress_callback.as_ref() {
            callback(ProgressEvent::DownloadComplete {
                url: url.to_string(),
                final_size,
            });
        }

        debug!("Stream download completed: {} bytes", final_size);
        Ok(final_size)
    }

    async fn stream_to_temp(
        &self,
        url: &str,
        temp_path: &Path,
        expected_size: Option<u64>,
        progress_callback: Option<&ProgressCallback>,
    ) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::HttpRequest {
                url: url.to_string(),
                source: e,
            })?;

        if let Err(e) = response.error_for_status_ref() {
            return Err(DownloadError::HttpRequest {
                url: url.to_string(),
                source: e,
            });
        }

        // Content-Length is exact; the size advertised by the API is only a hint
        let exact_size = response.content_length().filter(|len| *len > 0);
        let total_size = exact_size.or(expected_size);
        debug!("Content length: {:?}, total size: {:?}", response.content_length(), total_size);

        if let Some(callback) = progress_callback {
            callback(ProgressEvent::DownloadStarted {
                url: url.to_string(),
                total_size,
            });
        }

        let mut file = fs::File::create(temp_path)
            .await
            .map_err(|e| DownloadError::file_system(temp_path, FileOperation::Create, e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let start_time = Instant::now();

        // Each progress report is held back until the next slice arrives, so the
        // final report is known to be final and is the only one at 100%
        let mut pending: Option<u64> = None;

        let report = |downloaded: u64, total: Option<u64>| {
            if let Some(callback) = progress_callback {
                let elapsed = start_time.elapsed().as_secs_f64();
                let speed = if elapsed > 0.0 { downloaded as f64 / elapsed } else { 0.0 };

                callback(ProgressEvent::DownloadProgress {
                    url: url.to_string(),
                    downloaded,
                    total,
                    speed_bps: speed,
                });
            }
        };

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::HttpRequest {
                url: url.to_string(),
                source: e,
            })?;

            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece)
                    .await
                    .map_err(|e| DownloadError::file_system(temp_path, FileOperation::Write, e))?;

                downloaded += piece.len() as u64;

                if let Some(previous) = pending.replace(downloaded) {
                    report(previous, in_flight_total(previous, exact_size, expected_size));
                }
            }
        }

        if let Some(last) = pending {
            // A hint that was too small or too large is replaced by the real size
            let total = exact_size.or(expected_size.map(|_| last));
            report(last, total);
        }

        // Flush and sync file
        file.flush()
            .await
            .map_err(|e| DownloadError::file_system(temp_path, FileOperation::Write, e))?;
        file.sync_all()
            .await
            .map_err(|e| DownloadError::file_system(temp_path, FileOperation::Write, e))?;

        Ok(downloaded)
    }
}

/// Total to report for a slice that is known not to be the last one
///
/// An API hint that the body has already reached is dropped, leaving a
/// bytes-only report, so 100% is never shown before the transfer ends.
fn in_flight_total(downloaded: u64, exact_size: Option<u64>, expected_size: Option<u64>) -> Option<u64> {
    exact_size.or(expected_size.filter(|hint| *hint > downloaded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Helper struct to capture progress events during testing
    #[derive(Default)]
    struct ProgressCapture {
        events: Arc<Mutex<Vec<ProgressEvent>>>,
    }

    impl ProgressCapture {
        fn callback(&self) -> ProgressCallback {
            let events = self.events.clone();
            Arc::new(move |event| events.lock().unwrap().push(event))
        }

        fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    /// Serve one connection with a hand-written HTTP response, then close it
    async fn serve_raw(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}/asset.zip", addr)
    }

    /// Response with a chunked body and no Content-Length
    fn chunked_response(body: &[u8], chunk_len: usize) -> Vec<u8> {
        let mut response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n".to_vec();
        for chunk in body.chunks(chunk_len) {
            response.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
            response.extend_from_slice(chunk);
            response.extend_from_slice(b"\r\n");
        }
        response.extend_from_slice(b"0\r\n\r\n");
        response
    }

    fn progress_events(events: &[ProgressEvent]) -> Vec<&ProgressEvent> {
        events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::DownloadProgress { .. }))
            .collect()
    }

    fn client(chunk_size: usize) -> HttpClient {
        let config = FetchConfig::default().with_chunk_size(chunk_size);
        HttpClient::from_config(&config, &Credentials::Anonymous).unwrap()
    }

    #[tokio::test]
    async fn test_download_known_size_in_chunks() {
        let mock_server = MockServer::start().await;
        let body = vec![7u8; 20_000];

        Mock::given(method("GET"))
            .and(path("/asset.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&mock_server)
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("out").join("model_FBX.fbx.zip");
        let capture = ProgressCapture::default();

        let size = client(8192)
            .download_to_file(
                &format!("{}/asset.zip", mock_server.uri()),
                &dest,
                None,
                Some(capture.callback()),
            )
            .await
            .unwrap();

        assert_eq!(size, 20_000);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert!(!create_temp_path(&dest).exists());

        let events = capture.events();
        let progress: Vec<&ProgressEvent> = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::DownloadProgress { .. }))
            .collect();

        // No slice is larger than the chunk size
        let mut previous = 0;
        for event in &progress {
            if let ProgressEvent::DownloadProgress { downloaded, total, .. } = event {
                assert!(downloaded - previous <= 8192);
                assert_eq!(*total, Some(20_000));
                previous = *downloaded;
            }
        }

        let complete_reports = progress.iter().filter(|e| e.fraction() == Some(1.0)).count();
        assert_eq!(complete_reports, 1);
        assert_eq!(progress.last().and_then(|e| e.fraction()), Some(1.0));

        assert!(matches!(
            events.last(),
            Some(ProgressEvent::DownloadComplete { final_size: 20_000, .. })
        ));
    }

    #[tokio::test]
    async fn test_download_failure_removes_partial_file() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/expired.zip"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("model.fbx.zip");

        let result = client(8192)
            .download_to_file(&format!("{}/expired.zip", mock_server.uri()), &dest, None, None)
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, DownloadError::HttpRequest { .. }));
        assert!(!dest.exists());
        assert!(!create_temp_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_download_uses_expected_size_without_content_length() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/empty.zip"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("empty.zip");
        let capture = ProgressCapture::default();

        let size = client(1024)
            .download_to_file(
                &format!("{}/empty.zip", mock_server.uri()),
                &dest,
                Some(4096),
                Some(capture.callback()),
            )
            .await
            .unwrap();

        assert_eq!(size, 0);
        assert!(dest.exists());

        let started = capture
            .events()
            .into_iter()
            .find(|e| matches!(e, ProgressEvent::DownloadStarted { .. }));
        assert!(matches!(
            started,
            Some(ProgressEvent::DownloadStarted { total_size: Some(4096), .. })
        ));
    }

    #[tokio::test]
    async fn test_hint_smaller_than_chunked_body_reports_full_once() {
        let body = vec![3u8; 20_000];
        let url = serve_raw(chunked_response(&body, 5_000)).await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("model.fbx.zip");
        let capture = ProgressCapture::default();

        let size = client(8192)
            .download_to_file(&url, &dest, Some(8192), Some(capture.callback()))
            .await
            .unwrap();
        assert_eq!(size, 20_000);

        let events = capture.events();
        let progress = progress_events(&events);
        assert!(!progress.is_empty());

        let full_reports = progress.iter().filter(|e| e.fraction() == Some(1.0)).count();
        assert_eq!(full_reports, 1);
        assert_eq!(progress.last().and_then(|e| e.fraction()), Some(1.0));

        for event in &progress {
            if let ProgressEvent::DownloadProgress { downloaded, total: Some(total), .. } = event {
                assert!(downloaded <= total, "{} of {}", downloaded, total);
            }
        }
    }

    #[tokio::test]
    async fn test_hint_larger_than_chunked_body_still_completes() {
        let body = vec![5u8; 12_000];
        let url = serve_raw(chunked_response(&body, 4_000)).await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("model.obj.zip");
        let capture = ProgressCapture::default();

        client(8192)
            .download_to_file(&url, &dest, Some(50_000), Some(capture.callback()))
            .await
            .unwrap();

        let events = capture.events();
        let progress = progress_events(&events);

        let full_reports = progress.iter().filter(|e| e.fraction() == Some(1.0)).count();
        assert_eq!(full_reports, 1);
        assert!(matches!(
            progress.last(),
            Some(ProgressEvent::DownloadProgress { downloaded: 12_000, total: Some(12_000), .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_body_removes_partial_file() {
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(b"0123456789");
        let url = serve_raw(response).await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("model.gltf.zip");

        let err = client(8192)
            .download_to_file(&url, &dest, None, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::core::FailureKind::TransferFailure);
        assert!(!dest.exists());
        assert!(!create_temp_path(&dest).exists());
    }
}
