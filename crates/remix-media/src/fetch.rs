//! Source audio download over HTTP.
//!
//! Streams the response body straight to the staging file, follows redirects
//! by hand so the partial file is dropped before every hop, and enforces one
//! overall deadline across all hops. Any failure removes the partial file.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use metrics::histogram;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{redirect, StatusCode};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::remove_file_if_exists;
use crate::progress::{FetchProgress, FetchProgressCallback};

/// Browser-like user agent; some origins reject default client identifiers.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default overall download deadline.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Default redirect hop cap.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Summary of a completed download.
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// URL the bytes were finally served from
    pub final_url: String,
    /// Bytes written to the destination
    pub bytes: u64,
    /// Redirect hops followed
    pub redirects: usize,
    /// Content type reported by the origin
    pub content_type: Option<String>,
}

/// Retrieves bytes from a URL into a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into `dest`.
    ///
    /// On error `dest` does not exist afterwards.
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<FetchReport>;
}

/// reqwest-backed fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_redirects: usize,
    progress: Option<FetchProgressCallback>,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("timeout", &self.timeout)
            .field("max_redirects", &self.max_redirects)
            .finish()
    }
}

impl HttpFetcher {
    /// Create a fetcher with an overall deadline and redirect cap.
    pub fn new(timeout: Duration, max_redirects: usize) -> MediaResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            timeout,
            max_redirects,
            progress: None,
        })
    }

    /// Attach a progress observer.
    pub fn with_progress(mut self, callback: FetchProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_following_redirects(&self, url: &str, dest: &Path) -> MediaResult<FetchReport> {
        let mut current = parse_http_url(url)?;
        let mut redirects = 0usize;

        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| MediaError::download_failed(format!("request to {} failed: {}", current, e)))?;

            let status = response.status();

            if is_redirect(status) {
                // Each hop starts from a clean destination
                remove_file_if_exists(dest).await?;

                if redirects >= self.max_redirects {
                    return Err(MediaError::TooManyRedirects(self.max_redirects));
                }

                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| MediaError::download_failed("redirect without Location header"))?;

                let next = current
                    .join(location)
                    .map_err(|e| MediaError::InvalidUrl(format!("{}: {}", location, e)))?;
                ensure_http_scheme(&next)?;

                debug!(
                    from = %current,
                    to = %next,
                    status = status.as_u16(),
                    "Following redirect"
                );
                current = next;
                redirects += 1;
                continue;
            }

            if !status.is_success() {
                return Err(MediaError::HttpStatus {
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let bytes = self.stream_to_file(response, dest).await?;
            if bytes == 0 {
                return Err(MediaError::download_failed("empty response body"));
            }

            return Ok(FetchReport {
                final_url: current.to_string(),
                bytes,
                redirects,
                content_type,
            });
        }
    }

    /// Write the body chunk by chunk without buffering it whole.
    async fn stream_to_file(&self, response: reqwest::Response, dest: &Path) -> MediaResult<u64> {
        let total = response.content_length();
        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_logged_decile: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::download_failed(format!("body read failed: {}", e)))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            let progress = FetchProgress { downloaded, total };
            if let Some(pct) = progress.percentage() {
                let decile = (pct / 10.0) as u64;
                if decile > last_logged_decile {
                    last_logged_decile = decile;
                    debug!(downloaded, total = ?total, "Download progress: {:.0}%", pct);
                }
            }
            if let Some(callback) = &self.progress {
                callback(progress);
            }
        }

        file.flush().await?;
        Ok(downloaded)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<FetchReport> {
        let start = Instant::now();
        info!(url = %url, dest = %dest.display(), "Downloading source audio");

        let result = tokio::time::timeout(self.timeout, self.fetch_following_redirects(url, dest)).await;

        let outcome = match result {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MediaError::DownloadTimeout(self.timeout.as_secs())),
        };

        match outcome {
            Ok(report) => {
                histogram!("remix_download_duration_seconds").record(start.elapsed().as_secs_f64());
                info!(
                    bytes = report.bytes,
                    redirects = report.redirects,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Download complete"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(cleanup) = remove_file_if_exists(dest).await {
                    warn!(dest = %dest.display(), "Failed to remove partial download: {}", cleanup);
                }
                warn!(url = %url, "Download failed: {}", e);
                Err(e)
            }
        }
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Parse a URL and require an http(s) scheme.
pub fn parse_http_url(raw: &str) -> MediaResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| MediaError::InvalidUrl(format!("{}: {}", raw, e)))?;
    ensure_http_scheme(&url)?;
    Ok(url)
}

fn ensure_http_scheme(url: &Url) -> MediaResult<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(MediaError::InvalidUrl(format!("unsupported scheme '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use wiremock::matchers::{header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(10), DEFAULT_MAX_REDIRECTS).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/song.mp3"))
            .and(header("accept", "*/*"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("source.audio");
        let report = fetcher()
            .fetch(&format!("{}/song.mp3", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(report.bytes, 4096);
        assert_eq!(report.redirects, 0);
        assert_eq!(std::fs::read(&dest).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_regex("user-agent", "^Mozilla/5\\.0 .*Chrome/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 10]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("ua.audio");
        fetcher().fetch(&server.uri(), &dest).await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_404_removes_partial() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing.audio");
        let err = fetcher().fetch(&server.uri(), &dest).await.unwrap_err();

        assert_eq!(err.http_status(), Some(404));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![3u8; 2048]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("redirected.audio");
        let report = fetcher()
            .fetch(&format!("{}/old", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(report.redirects, 1);
        assert!(report.final_url.ends_with("/new"));
        assert_eq!(std::fs::read(&dest).unwrap(), vec![3u8; 2048]);
    }

    #[tokio::test]
    async fn test_fetch_redirect_loop_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/loop"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("loop.audio");
        let err = HttpFetcher::new(Duration::from_secs(10), 3)
            .unwrap()
            .fetch(&format!("{}/loop", server.uri()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::TooManyRedirects(3)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_timeout_removes_partial() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 2048])
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("slow.audio");
        let err = HttpFetcher::new(Duration::from_millis(200), DEFAULT_MAX_REDIRECTS)
            .unwrap()
            .fetch(&server.uri(), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::DownloadTimeout(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_empty_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("empty.audio");
        let err = fetcher().fetch(&server.uri(), &dest).await.unwrap_err();

        assert!(matches!(err, MediaError::DownloadFailed { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_reports_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8; 8192]))
            .mount(&server)
            .await;

        let seen = Arc::new(AtomicU64::new(0));
        let observer = Arc::clone(&seen);
        let fetcher = fetcher().with_progress(Arc::new(move |p: FetchProgress| {
            observer.store(p.downloaded, Ordering::SeqCst);
        }));

        let dir = TempDir::new().unwrap();
        fetcher
            .fetch(&server.uri(), &dir.path().join("p.audio"))
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 8192);
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(parse_http_url("ftp://example.com/a.mp3").is_err());
        assert!(parse_http_url("not a url").is_err());
        assert!(parse_http_url("https://example.com/a.mp3").is_ok());
    }
}
