//! Transfer orchestrator worker.
//!
//! This crate provides:
//! - The per-run transfer state machine (list → filter → download →
//!   upload → record → cleanup)
//! - Explicit environment-derived configuration
//! - Logging setup (console plus plain-text log file mirror)

pub mod config;
pub mod error;
pub mod logging;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use processor::{TransferRun, VideoUploader};
