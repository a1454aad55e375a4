//! YouTube client error types and classification.

use thiserror::Error;

use crate::types::ApiErrorEnvelope;

/// Result type for YouTube operations.
pub type YoutubeResult<T> = Result<T, YoutubeError>;

/// Errors that can occur during authentication or upload.
#[derive(Debug, Error)]
pub enum YoutubeError {
    /// Daily API quota exhausted. Fatal for the whole run, not just the
    /// current file.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Too many requests; retried with backoff by the outer upload loop.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 5xx-class response; retried by the inner resumable loop.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Response shape the protocol does not allow. Never retried.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl YoutubeError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    /// Classify a non-success API response from its status and body.
    ///
    /// The platform reports quota and rate-limit conditions as `reason`
    /// strings inside a JSON error envelope; 5xx responses without a
    /// recognized reason are retriable server errors.
    pub fn from_api_response(status: u16, body: &str) -> Self {
        if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(body) {
            match envelope.primary_reason() {
                Some("quotaExceeded") => {
                    return Self::QuotaExceeded(envelope.message().to_string());
                }
                Some("rateLimitExceeded") | Some("userRateLimitExceeded") => {
                    return Self::RateLimited(envelope.message().to_string());
                }
                _ => {}
            }
        }

        if (500..600).contains(&status) {
            Self::ServerError {
                status,
                message: body.chars().take(200).collect(),
            }
        } else {
            Self::UploadFailed(format!("API returned {}: {}", status, body))
        }
    }

    /// True for the quota condition that aborts the entire run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }

    /// True for errors the inner resumable loop may retry: 5xx-class
    /// server statuses and transport-level failures.
    pub fn is_chunk_retriable(&self) -> bool {
        matches!(self, Self::ServerError { .. } | Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTA_BODY: &str = r#"{"error": {"code": 403, "message": "Daily quota exceeded.",
        "errors": [{"reason": "quotaExceeded", "domain": "youtube.quota"}]}}"#;

    const RATE_BODY: &str = r#"{"error": {"code": 403, "message": "Slow down.",
        "errors": [{"reason": "rateLimitExceeded"}]}}"#;

    #[test]
    fn test_quota_classification() {
        let err = YoutubeError::from_api_response(403, QUOTA_BODY);
        assert!(matches!(err, YoutubeError::QuotaExceeded(_)));
        assert!(err.is_fatal());
        assert!(!err.is_chunk_retriable());
    }

    #[test]
    fn test_rate_limit_classification() {
        let err = YoutubeError::from_api_response(403, RATE_BODY);
        assert!(matches!(err, YoutubeError::RateLimited(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_server_error_classification() {
        let err = YoutubeError::from_api_response(503, "Service Unavailable");
        assert!(matches!(
            err,
            YoutubeError::ServerError { status: 503, .. }
        ));
        assert!(err.is_chunk_retriable());
    }

    #[test]
    fn test_plain_client_error_is_not_retriable() {
        let err = YoutubeError::from_api_response(400, r#"{"error": {"message": "bad"}}"#);
        assert!(matches!(err, YoutubeError::UploadFailed(_)));
        assert!(!err.is_chunk_retriable());
        assert!(!err.is_fatal());
    }
}
