//! Disk client error types.

use thiserror::Error;

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur while talking to the remote storage API.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("Listing failed: {0}")]
    ListFailed(String),

    #[error("Download link resolution failed: {0}")]
    LinkFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiskError {
    pub fn list_failed(msg: impl Into<String>) -> Self {
        Self::ListFailed(msg.into())
    }

    pub fn link_failed(msg: impl Into<String>) -> Self {
        Self::LinkFailed(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}
