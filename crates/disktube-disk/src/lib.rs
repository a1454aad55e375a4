//! Yandex Disk public folder client.
//!
//! This crate provides:
//! - Shared-folder listing (files only)
//! - Direct download link resolution
//! - Streaming downloads with bounded retry and coarse progress logging

pub mod client;
pub mod error;
pub mod progress;
pub mod types;

pub use client::{DiskClient, DiskConfig, DownloadRetryConfig, DownloadedFile};
pub use error::{DiskError, DiskResult};
pub use progress::ProgressThreshold;
