//! Resumable chunked upload state machine.
//!
//! One `ResumableSession` drives a single upload attempt against a
//! session URI: send chunks from the current offset, advance on 308
//! responses, finish when the server answers with a video id. Retriable
//! errors (5xx, transport) back off exponentially and re-probe the
//! server for the acknowledged offset; the fourth retriable error within
//! one attempt gives up.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

use disktube_models::VideoId;

use crate::error::{YoutubeError, YoutubeResult};
use crate::types::UploadResponse;

/// Bytes per upload chunk.
pub const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Retriable errors tolerated within one upload attempt.
pub const MAX_CHUNK_RETRIES: u32 = 3;

/// Backoff cap, in backoff units.
const MAX_BACKOFF_UNITS: u64 = 60;

/// Backoff before retry `retry_count` (1-based): `min(2^n, 60)` units.
pub fn backoff_units(retry_count: u32) -> u64 {
    2u64.checked_pow(retry_count)
        .map(|units| units.min(MAX_BACKOFF_UNITS))
        .unwrap_or(MAX_BACKOFF_UNITS)
}

/// The same backoff as a duration of seconds, the production unit.
pub fn backoff_delay(retry_count: u32) -> Duration {
    Duration::from_secs(backoff_units(retry_count))
}

/// Tuning for the inner resumable loop. The defaults are the protocol
/// contract; tests shrink `chunk_size` and `backoff_unit`.
#[derive(Debug, Clone)]
pub struct ResumableUploadConfig {
    pub chunk_size: usize,
    pub max_retries: u32,
    pub backoff_unit: Duration,
}

impl Default for ResumableUploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: UPLOAD_CHUNK_SIZE,
            max_retries: MAX_CHUNK_RETRIES,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

/// Outcome of one chunk exchange.
enum ChunkOutcome {
    /// Server acknowledged up to (not including) this offset.
    Continue(u64),
    /// Upload finished with this video id.
    Done(VideoId),
}

/// One resumable upload attempt bound to a session URI.
pub struct ResumableSession {
    http: Client,
    session_uri: String,
    access_token: String,
    total_size: u64,
    config: ResumableUploadConfig,
}

impl ResumableSession {
    pub fn new(
        http: Client,
        session_uri: impl Into<String>,
        access_token: impl Into<String>,
        total_size: u64,
        config: ResumableUploadConfig,
    ) -> Self {
        Self {
            http,
            session_uri: session_uri.into(),
            access_token: access_token.into(),
            total_size,
            config,
        }
    }

    /// Drive the upload to completion or a terminal failure.
    pub async fn upload(&self, path: &Path) -> YoutubeResult<VideoId> {
        if self.total_size == 0 {
            return Err(YoutubeError::upload_failed(format!(
                "{} is empty",
                path.display()
            )));
        }

        let mut file = tokio::fs::File::open(path).await?;
        let mut offset: u64 = 0;
        let mut retry_count: u32 = 0;

        loop {
            match self.send_chunk(&mut file, offset).await {
                Ok(ChunkOutcome::Done(id)) => {
                    info!(video_id = %id, "Upload session complete");
                    return Ok(id);
                }
                Ok(ChunkOutcome::Continue(next_offset)) => {
                    debug!(
                        offset = next_offset,
                        total = self.total_size,
                        "Chunk acknowledged"
                    );
                    offset = next_offset;
                }
                Err(e) if e.is_chunk_retriable() => {
                    retry_count += 1;
                    if retry_count > self.config.max_retries {
                        return Err(YoutubeError::upload_failed(format!(
                            "No longer attempting to retry: {}",
                            e
                        )));
                    }

                    let units = backoff_units(retry_count);
                    warn!(
                        retry = retry_count,
                        backoff_units = units,
                        error = %e,
                        "Retriable upload error, backing off"
                    );
                    tokio::time::sleep(self.config.backoff_unit.saturating_mul(units as u32))
                        .await;

                    // Ask the server what it actually has before resending;
                    // probe failures keep the current offset, which is safe
                    // to resend.
                    match self.query_offset(offset).await {
                        Ok(ChunkOutcome::Done(id)) => return Ok(id),
                        Ok(ChunkOutcome::Continue(next_offset)) => offset = next_offset,
                        Err(probe_err) => {
                            debug!(error = %probe_err, "Offset probe failed, resending chunk");
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send the next chunk starting at `offset`.
    async fn send_chunk(
        &self,
        file: &mut tokio::fs::File,
        offset: u64,
    ) -> YoutubeResult<ChunkOutcome> {
        let remaining = self.total_size - offset;
        if remaining == 0 {
            return Err(YoutubeError::protocol(
                "server acknowledged all bytes without a final response",
            ));
        }
        let chunk_len = (self.config.chunk_size as u64).min(remaining);

        file.seek(std::io::SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; chunk_len as usize];
        file.read_exact(&mut buf).await?;

        let end = offset + chunk_len - 1;
        let response = self
            .http
            .put(&self.session_uri)
            .bearer_auth(&self.access_token)
            .header(
                CONTENT_RANGE,
                format!("bytes {}-{}/{}", offset, end, self.total_size),
            )
            .body(buf)
            .send()
            .await?;

        self.interpret_response(response, offset).await
    }

    /// Ask the server for the acknowledged offset with an empty
    /// `Content-Range: bytes */total` request.
    async fn query_offset(&self, current_offset: u64) -> YoutubeResult<ChunkOutcome> {
        let response = self
            .http
            .put(&self.session_uri)
            .bearer_auth(&self.access_token)
            .header(CONTENT_RANGE, format!("bytes */{}", self.total_size))
            .body(Vec::new())
            .send()
            .await?;

        self.interpret_response(response, current_offset).await
    }

    /// Map a session response onto the state machine.
    async fn interpret_response(
        &self,
        response: reqwest::Response,
        current_offset: u64,
    ) -> YoutubeResult<ChunkOutcome> {
        let status = response.status();

        // 308 Resume Incomplete: the Range header names the last byte the
        // server has; without one the current offset is resent.
        if status == StatusCode::PERMANENT_REDIRECT {
            let next = response
                .headers()
                .get(RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_range_end)
                .map(|last| last + 1)
                .unwrap_or(current_offset);
            return Ok(ChunkOutcome::Continue(next));
        }

        if status.is_success() {
            let body = response.text().await?;
            let parsed: UploadResponse = serde_json::from_str(&body)
                .map_err(|_| YoutubeError::protocol(format!("unexpected response: {}", body)))?;
            return match parsed.id {
                Some(id) => Ok(ChunkOutcome::Done(VideoId::from(id))),
                None => Err(YoutubeError::protocol(format!(
                    "upload response carries no video id: {}",
                    body
                ))),
            };
        }

        let body = response.text().await.unwrap_or_default();
        Err(YoutubeError::from_api_response(status.as_u16(), &body))
    }
}

/// Last acknowledged byte from a `Range: bytes=0-N` header.
fn parse_range_end(value: &str) -> Option<u64> {
    value
        .strip_prefix("bytes=")?
        .rsplit_once('-')?
        .1
        .parse()
        .ok()
}
