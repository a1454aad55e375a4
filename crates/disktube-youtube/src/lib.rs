//! YouTube upload client.
//!
//! This crate provides:
//! - OAuth credential bootstrap: stored credential, refresh, and an
//!   injectable interactive authorization flow
//! - The resumable chunked upload state machine
//! - Platform error classification (quota, rate limit, server errors)

pub mod auth;
pub mod client;
pub mod error;
pub mod types;
pub mod upload;

pub use auth::{AuthFlow, Authenticator, ClientSecrets, CredentialStore, InstalledFlow, StoredCredential};
pub use client::{UploadRetryConfig, YoutubeClient, YoutubeConfig};
pub use error::{YoutubeError, YoutubeResult};
pub use types::UploadMetadata;
pub use upload::{backoff_delay, ResumableSession, ResumableUploadConfig};
