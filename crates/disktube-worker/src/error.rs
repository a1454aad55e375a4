//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Disk error: {0}")]
    Disk(#[from] disktube_disk::DiskError),

    #[error("Upload error: {0}")]
    Youtube(#[from] disktube_youtube::YoutubeError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] disktube_ledger::LedgerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True when the whole run must abort, not just the current file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::Youtube(e) if e.is_fatal())
    }
}
