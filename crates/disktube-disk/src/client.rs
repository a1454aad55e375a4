//! Yandex Disk public API client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Url};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use disktube_models::RemoteFile;

use crate::error::{DiskError, DiskResult};
use crate::progress::ProgressThreshold;
use crate::types::{DownloadLinkResponse, PublicResourcesResponse};

/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://cloud-api.yandex.net/v1/disk";

/// Retry behavior for streaming downloads.
///
/// Delays are linear: `attempt * delay_unit`, with no sleep after the
/// final attempt.
#[derive(Debug, Clone)]
pub struct DownloadRetryConfig {
    /// Total attempts per download (initial try included).
    pub max_attempts: u32,
    /// Linear backoff unit.
    pub delay_unit: Duration,
}

impl Default for DownloadRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_unit: Duration::from_secs(5),
        }
    }
}

impl DownloadRetryConfig {
    /// Delay before the next attempt, or `None` after the final one.
    pub fn delay_after_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.max_attempts {
            Some(self.delay_unit.saturating_mul(attempt))
        } else {
            None
        }
    }
}

/// Configuration for the disk client.
#[derive(Debug, Clone)]
pub struct DiskConfig {
    /// Shared folder reference: a `https://disk.yandex.ru/d/...` URL or a
    /// bare public key.
    pub public_key: String,
    /// Optional OAuth token for authenticated requests.
    pub oauth_token: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// Timeout for metadata requests (listing, link resolution).
    pub timeout: Duration,
    /// Timeout for a whole download request.
    pub download_timeout: Duration,
    /// Download retry behavior.
    pub retry: DownloadRetryConfig,
}

impl DiskConfig {
    /// Create a config for the given shared folder.
    pub fn new(public_key: impl Into<String>, oauth_token: Option<String>) -> Self {
        Self {
            public_key: public_key.into(),
            oauth_token,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(300),
            retry: DownloadRetryConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> DiskResult<Self> {
        let public_key = std::env::var("YANDEX_DISK_PUBLIC_KEY")
            .map_err(|_| DiskError::list_failed("YANDEX_DISK_PUBLIC_KEY not set"))?;
        let oauth_token = std::env::var("YANDEX_OAUTH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        Ok(Self::new(public_key, oauth_token))
    }
}

/// A file fully written to local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Extract the bare public key from a share URL.
///
/// `https://disk.yandex.ru/d/Y1yHasRikR9qBQ` resolves to
/// `Y1yHasRikR9qBQ`; anything that is not a `/d/` share URL is used
/// verbatim.
fn extract_public_key(raw: &str) -> String {
    if let Ok(url) = Url::parse(raw) {
        if let Some(key) = url.path().strip_prefix("/d/") {
            let key = key.trim_end_matches('/');
            if !key.is_empty() {
                return key.to_string();
            }
        }
    }
    raw.to_string()
}

/// Client for a Yandex Disk public folder.
#[derive(Clone)]
pub struct DiskClient {
    http: Client,
    public_key: String,
    config: DiskConfig,
}

impl DiskClient {
    /// Create a new disk client.
    pub fn new(config: DiskConfig) -> DiskResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("disktube-disk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DiskError::Network)?;

        let public_key = extract_public_key(&config.public_key);

        Ok(Self {
            http,
            public_key,
            config,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> DiskResult<Self> {
        Self::new(DiskConfig::from_env()?)
    }

    /// The bare public key sent to the API.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// List files in the shared folder.
    ///
    /// Directories are filtered out; failures are propagated, not retried.
    pub async fn list_files(&self) -> DiskResult<Vec<RemoteFile>> {
        let url = format!("{}/public/resources", self.config.base_url);

        let mut request = self
            .http
            .get(&url)
            .query(&[("public_key", self.public_key())]);
        if let Some(token) = &self.config.oauth_token {
            request = request.header("Authorization", format!("OAuth {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiskError::list_failed(format!(
                "listing returned {}: {}",
                status, body
            )));
        }

        let listing: PublicResourcesResponse = response
            .json()
            .await
            .map_err(|e| DiskError::malformed(format!("listing body: {}", e)))?;

        let files: Vec<RemoteFile> = listing
            .embedded
            .map(|e| e.items)
            .unwrap_or_default()
            .into_iter()
            .filter(|item| item.is_file())
            .map(|item| item.into_remote_file())
            .collect();

        info!("Found {} files in shared folder", files.len());
        Ok(files)
    }

    /// Resolve a time-limited direct download URL for a remote path.
    ///
    /// Not retried internally; the caller decides.
    pub async fn download_url(&self, path: &str) -> DiskResult<String> {
        let url = format!("{}/public/resources/download", self.config.base_url);

        let mut request = self
            .http
            .get(&url)
            .query(&[("public_key", self.public_key()), ("path", path)]);
        if let Some(token) = &self.config.oauth_token {
            request = request.header("Authorization", format!("OAuth {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiskError::link_failed(format!(
                "{} returned {}: {}",
                path, status, body
            )));
        }

        let link: DownloadLinkResponse = response
            .json()
            .await
            .map_err(|e| DiskError::malformed(format!("download link body: {}", e)))?;

        Ok(link.href)
    }

    /// Stream a file to `local_path`, creating parent directories.
    ///
    /// Retries transient failures up to the configured attempt limit with
    /// linear backoff. Exhaustion returns the last error; a partial file
    /// may remain on disk and is rewritten on the next attempt or run.
    pub async fn download(&self, url: &str, local_path: &Path) -> DiskResult<DownloadedFile> {
        let retry = &self.config.retry;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            info!(
                path = %local_path.display(),
                attempt,
                max_attempts = retry.max_attempts,
                "Downloading file"
            );

            match self.download_once(url, local_path).await {
                Ok(downloaded) => {
                    info!(
                        path = %local_path.display(),
                        size_mb = downloaded.bytes as f64 / (1024.0 * 1024.0),
                        "Download complete"
                    );
                    return Ok(downloaded);
                }
                Err(e) => {
                    warn!(
                        path = %local_path.display(),
                        attempt,
                        error = %e,
                        "Download attempt failed"
                    );
                    match retry.delay_after_attempt(attempt) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(e),
                    }
                }
            }
        }
    }

    /// One streaming download attempt.
    async fn download_once(&self, url: &str, local_path: &Path) -> DiskResult<DownloadedFile> {
        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let response = self
            .http
            .get(url)
            .timeout(self.config.download_timeout)
            .send()
            .await?
            .error_for_status()?;

        let total = response.content_length().unwrap_or(0);
        let mut stream = response.bytes_stream();
        let mut file = tokio::fs::File::create(local_path).await?;
        let mut progress = ProgressThreshold::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            if progress.add(chunk.len() as u64) {
                let done = progress.transferred();
                if total > 0 {
                    info!(
                        "Downloaded {:.1} MB / {:.1} MB ({:.1}%)",
                        done as f64 / (1024.0 * 1024.0),
                        total as f64 / (1024.0 * 1024.0),
                        done as f64 / total as f64 * 100.0
                    );
                } else {
                    info!("Downloaded {:.1} MB", done as f64 / (1024.0 * 1024.0));
                }
            }
        }

        file.flush().await?;

        Ok(DownloadedFile {
            path: local_path.to_path_buf(),
            bytes: progress.transferred(),
        })
    }
}
