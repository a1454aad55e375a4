//! YouTube upload client.

use std::path::Path;
use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};

use disktube_models::VideoId;

use crate::auth::Authenticator;
use crate::error::{YoutubeError, YoutubeResult};
use crate::types::{UploadMetadata, VIDEO_MIME_TYPE};
use crate::upload::{ResumableSession, ResumableUploadConfig};

/// Default upload API base URL.
const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/youtube/v3";

/// Outer per-upload retry behavior.
///
/// Delays are linear: `attempt * delay_unit`, with no sleep after the
/// final attempt. The quota condition is never retried.
#[derive(Debug, Clone)]
pub struct UploadRetryConfig {
    /// Total upload attempts per file (initial try included).
    pub max_attempts: u32,
    /// Linear backoff unit.
    pub delay_unit: Duration,
}

impl Default for UploadRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_unit: Duration::from_secs(10),
        }
    }
}

impl UploadRetryConfig {
    /// Delay before the next attempt, or `None` after the final one.
    pub fn delay_after_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.max_attempts {
            Some(self.delay_unit.saturating_mul(attempt))
        } else {
            None
        }
    }
}

/// Configuration for the upload client.
#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    /// Upload API base URL.
    pub upload_base_url: String,
    /// Connect timeout for API calls. Requests carry no overall timeout;
    /// chunk uploads of large files legitimately run for minutes.
    pub connect_timeout: Duration,
    /// Outer per-upload retry behavior.
    pub retry: UploadRetryConfig,
    /// Inner resumable-loop tuning.
    pub resumable: ResumableUploadConfig,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            retry: UploadRetryConfig::default(),
            resumable: ResumableUploadConfig::default(),
        }
    }
}

/// Client for uploading videos.
pub struct YoutubeClient {
    http: Client,
    config: YoutubeConfig,
    authenticator: Authenticator,
}

impl YoutubeClient {
    /// Create a new upload client.
    pub fn new(config: YoutubeConfig, authenticator: Authenticator) -> YoutubeResult<Self> {
        // 308 is a protocol state here, never a redirect to follow.
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("disktube-youtube/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(YoutubeError::Network)?;

        Ok(Self {
            http,
            config,
            authenticator,
        })
    }

    /// Upload a local video file with fixed transfer metadata.
    ///
    /// Retries the whole attempt up to the configured limit with linear
    /// backoff. Quota exhaustion is fatal and returned immediately so the
    /// orchestrator can abort the run; every other failure is scoped to
    /// this file.
    pub async fn upload_video(&self, local_path: &Path, title: &str) -> YoutubeResult<VideoId> {
        let filename = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| title.to_string());
        let metadata = UploadMetadata::for_file(title, &filename);
        let total_size = tokio::fs::metadata(local_path).await?.len();

        let retry = &self.config.retry;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            info!(
                file = %filename,
                attempt,
                max_attempts = retry.max_attempts,
                "Uploading video"
            );

            match self.try_upload(local_path, &metadata, total_size).await {
                Ok(video_id) => {
                    info!(video_id = %video_id, title, "Successfully uploaded video");
                    return Ok(video_id);
                }
                Err(e) if e.is_fatal() => {
                    error!(file = %filename, error = %e, "Upload quota exhausted");
                    return Err(e);
                }
                Err(e) => match retry.delay_after_attempt(attempt) {
                    Some(delay) => {
                        if matches!(e, YoutubeError::RateLimited(_)) {
                            warn!(
                                file = %filename,
                                attempt,
                                delay_secs = delay.as_secs_f64(),
                                "Rate limited, waiting before retry"
                            );
                        } else {
                            warn!(
                                file = %filename,
                                attempt,
                                error = %e,
                                "Upload attempt failed"
                            );
                        }
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
            }
        }
    }

    /// One complete upload attempt: authenticate, open a session, drive
    /// the resumable loop.
    async fn try_upload(
        &self,
        local_path: &Path,
        metadata: &UploadMetadata,
        total_size: u64,
    ) -> YoutubeResult<VideoId> {
        let (session_uri, token) = self.start_session(metadata, total_size).await?;

        let session = ResumableSession::new(
            self.http.clone(),
            session_uri,
            token,
            total_size,
            self.config.resumable.clone(),
        );
        session.upload(local_path).await
    }

    /// Initiate a resumable session; the session URI arrives in the
    /// `Location` header. A rejected token is refreshed once.
    async fn start_session(
        &self,
        metadata: &UploadMetadata,
        total_size: u64,
    ) -> YoutubeResult<(String, String)> {
        let mut token = self.authenticator.access_token().await?;
        let mut response = self.initiate_once(&token, metadata, total_size).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Upload token rejected, refreshing");
            token = self.authenticator.force_refresh().await?;
            response = self.initiate_once(&token, metadata, total_size).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::from_api_response(status.as_u16(), &body));
        }

        let session_uri = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                YoutubeError::protocol("resumable initiation response carries no session URI")
            })?;

        Ok((session_uri, token))
    }

    async fn initiate_once(
        &self,
        token: &str,
        metadata: &UploadMetadata,
        total_size: u64,
    ) -> YoutubeResult<reqwest::Response> {
        let url = format!("{}/videos", self.config.upload_base_url);

        let response = self
            .http
            .post(&url)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(token)
            .header("X-Upload-Content-Length", total_size)
            .header("X-Upload-Content-Type", VIDEO_MIME_TYPE)
            .json(metadata)
            .send()
            .await?;

        Ok(response)
    }
}
