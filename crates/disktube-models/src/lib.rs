//! Shared data models for the disktube transfer pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Remote file listings
//! - YouTube video identifiers
//! - The persisted completion ledger document
//! - Per-run transfer statistics

pub mod ledger;
pub mod remote;
pub mod run;
pub mod video;

// Re-export common types
pub use ledger::{LedgerDocument, TransferRecord};
pub use remote::RemoteFile;
pub use run::{RunId, RunStats};
pub use video::VideoId;
