//! Worker configuration.

use std::path::PathBuf;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
///
/// Everything comes from the environment; there are no CLI arguments.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Shared folder reference: share URL or bare public key.
    pub public_key: String,
    /// Optional pre-provisioned disk OAuth token.
    pub yandex_oauth_token: Option<String>,
    /// Path to the OAuth client secrets JSON.
    pub client_secrets_file: PathBuf,
    /// Path of the persisted upload credential.
    pub token_file: PathBuf,
    /// Path of the completion ledger.
    pub ledger_path: PathBuf,
    /// Target file extension, matched case-insensitively.
    pub extension: String,
    /// Directory downloads land in.
    pub work_dir: PathBuf,
    /// Plain-text log file mirroring console output.
    pub log_file: PathBuf,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let public_key = std::env::var("YANDEX_DISK_PUBLIC_KEY")
            .map_err(|_| WorkerError::config("YANDEX_DISK_PUBLIC_KEY not set"))?;

        Ok(Self {
            public_key,
            yandex_oauth_token: std::env::var("YANDEX_OAUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            client_secrets_file: std::env::var("YOUTUBE_CLIENT_SECRETS_FILE")
                .unwrap_or_else(|_| "client_secret.json".to_string())
                .into(),
            token_file: std::env::var("YOUTUBE_TOKEN_FILE")
                .unwrap_or_else(|_| "youtube_token.json".to_string())
                .into(),
            ledger_path: std::env::var("UPLOADED_VIDEOS_LOG")
                .unwrap_or_else(|_| "uploaded_videos.json".to_string())
                .into(),
            extension: std::env::var("TARGET_EXTENSION").unwrap_or_else(|_| ".mov".to_string()),
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| ".".to_string())
                .into(),
            log_file: std::env::var("TRANSFER_LOG_FILE")
                .unwrap_or_else(|_| "transfer.log".to_string())
                .into(),
        })
    }
}
