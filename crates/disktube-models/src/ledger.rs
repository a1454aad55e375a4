//! Completion ledger document model.
//!
//! The ledger is a single JSON document, read and written wholesale:
//!
//! ```json
//! {
//!   "uploaded_files": ["a.mov", "b.mov"],
//!   "videos": {
//!     "a.mov": { "video_id": "...", "uploaded_at": "2025-01-04 18:22:10" }
//!   }
//! }
//! ```
//!
//! Both fields tolerate absence so a document written by an older build
//! (or trimmed by hand) still loads without dropping what it does carry.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::video::VideoId;

/// Timestamp format persisted in `uploaded_at`.
pub const UPLOADED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Record of one successful transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Identifier of the uploaded video on the hosting platform.
    pub video_id: VideoId,
    /// Human-readable upload time.
    pub uploaded_at: String,
}

impl TransferRecord {
    /// Create a record stamped with the current time.
    pub fn new(video_id: VideoId) -> Self {
        Self {
            video_id,
            uploaded_at: chrono::Utc::now().format(UPLOADED_AT_FORMAT).to_string(),
        }
    }
}

/// The persisted completion ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    /// Filenames with at least one successful upload.
    #[serde(default)]
    pub uploaded_files: Vec<String>,
    /// Per-filename transfer records.
    #[serde(default)]
    pub videos: HashMap<String, TransferRecord>,
}

impl LedgerDocument {
    /// All filenames considered completed.
    ///
    /// The union of `uploaded_files` and `videos` keys, so a document with
    /// either field missing still skips everything it knows about.
    pub fn completed_names(&self) -> HashSet<String> {
        self.uploaded_files
            .iter()
            .cloned()
            .chain(self.videos.keys().cloned())
            .collect()
    }

    /// Insert or overwrite the record for `filename`.
    ///
    /// `uploaded_files` is kept duplicate-free even when the same file is
    /// recorded twice across runs.
    pub fn insert(&mut self, filename: &str, record: TransferRecord) {
        if !self.uploaded_files.iter().any(|f| f == filename) {
            self.uploaded_files.push(filename.to_string());
        }
        self.videos.insert(filename.to_string(), record);
    }
}
