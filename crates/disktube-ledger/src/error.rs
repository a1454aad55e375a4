//! Ledger error types.

use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while persisting the ledger.
///
/// Read-side problems never surface here; unreadable state is treated as
/// empty. Only a failed write is an error, because losing a completion
/// record would re-upload the file on the next run.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
