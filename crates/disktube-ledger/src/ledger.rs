//! Ledger persistence.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use disktube_models::{LedgerDocument, TransferRecord, VideoId};

use crate::error::LedgerResult;

/// Durable filename → transfer-record store, the sole source of truth for
/// "already transferred".
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Create a ledger backed by the given file path. The file does not
    /// need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filenames with a recorded successful upload.
    ///
    /// Absent or unreadable state yields an empty set; corruption is
    /// logged and never fails the run.
    pub async fn load_completed(&self) -> HashSet<String> {
        self.load_document().await.completed_names()
    }

    /// Record a confirmed successful upload.
    ///
    /// Re-reads the current state, merges the new entry in, and replaces
    /// the file atomically (write-then-rename), so a crash mid-write
    /// never leaves a document that parses but has dropped prior entries.
    pub async fn record(&self, filename: &str, video_id: VideoId) -> LedgerResult<()> {
        let mut doc = self.load_document().await;
        doc.insert(filename, TransferRecord::new(video_id.clone()));
        self.write_atomic(&doc).await?;

        info!(
            file = filename,
            video_id = %video_id,
            "Recorded completed transfer"
        );
        Ok(())
    }

    /// Read and parse the document, treating any failure as empty state.
    async fn load_document(&self) -> LedgerDocument {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No ledger file yet");
                return LedgerDocument::default();
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not read ledger, treating as empty"
                );
                return LedgerDocument::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ledger is corrupt, treating as empty"
                );
                LedgerDocument::default()
            }
        }
    }

    /// Serialize the whole document and rename it over the current file.
    async fn write_atomic(&self, doc: &LedgerDocument) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_in(dir: &tempfile::TempDir) -> Ledger {
        Ledger::new(dir.path().join("uploaded_videos.json"))
    }

    #[tokio::test]
    async fn test_absent_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        assert!(ledger.load_completed().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "{not json").unwrap();

        assert!(ledger.load_completed().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        ledger.record("a.mov", VideoId::from("vid-a")).await.unwrap();

        let completed = ledger.load_completed().await;
        assert!(completed.contains("a.mov"));
        assert_eq!(completed.len(), 1);
    }

    #[tokio::test]
    async fn test_record_preserves_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        std::fs::write(
            ledger.path(),
            r#"{
                "uploaded_files": ["old.mov"],
                "videos": {
                    "old.mov": {"video_id": "vid-old", "uploaded_at": "2024-12-01 10:00:00"}
                }
            }"#,
        )
        .unwrap();

        ledger.record("new.mov", VideoId::from("vid-new")).await.unwrap();

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        let doc: LedgerDocument = serde_json::from_str(&content).unwrap();

        assert_eq!(doc.uploaded_files.len(), 2);
        assert_eq!(doc.videos["old.mov"].video_id, VideoId::from("vid-old"));
        assert_eq!(doc.videos["old.mov"].uploaded_at, "2024-12-01 10:00:00");
        assert_eq!(doc.videos["new.mov"].video_id, VideoId::from("vid-new"));
    }

    #[tokio::test]
    async fn test_record_recovers_from_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "garbage").unwrap();

        ledger.record("a.mov", VideoId::from("vid-a")).await.unwrap();

        let completed = ledger.load_completed().await;
        assert_eq!(completed.len(), 1);
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        ledger.record("a.mov", VideoId::from("vid-a")).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["uploaded_videos.json".to_string()]);
    }
}
