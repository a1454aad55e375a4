//! The per-run transfer state machine.
//!
//! One `TransferRun` drives: load ledger → list remote files → filter to
//! candidates → for each candidate, download, upload, record, clean up.
//! Files are processed strictly one at a time so local disk holds at
//! most one video. A failure at any step is terminal for that file only;
//! the single exception is quota exhaustion, which aborts the whole run.

use std::path::Path;

use async_trait::async_trait;
use tracing::{error, info, warn};

use disktube_disk::DiskClient;
use disktube_ledger::Ledger;
use disktube_models::{RemoteFile, RunId, RunStats, VideoId};
use disktube_youtube::{YoutubeClient, YoutubeResult};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Upload capability the orchestrator drives.
///
/// A seam over the concrete client so run-level behavior is testable
/// without the platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoUploader: Send + Sync {
    async fn upload_video(&self, local_path: &Path, title: &str) -> YoutubeResult<VideoId>;
}

#[async_trait]
impl VideoUploader for YoutubeClient {
    async fn upload_video(&self, local_path: &Path, title: &str) -> YoutubeResult<VideoId> {
        YoutubeClient::upload_video(self, local_path, title).await
    }
}

/// One transfer run over the configured shared folder.
pub struct TransferRun {
    config: WorkerConfig,
    disk: DiskClient,
    uploader: Box<dyn VideoUploader>,
    ledger: Ledger,
}

impl TransferRun {
    pub fn new(
        config: WorkerConfig,
        disk: DiskClient,
        uploader: Box<dyn VideoUploader>,
        ledger: Ledger,
    ) -> Self {
        Self {
            config,
            disk,
            uploader,
            ledger,
        }
    }

    /// Drive the run to completion.
    ///
    /// Returns aggregate statistics; an error return means the run could
    /// not start (listing failed) or was aborted by quota exhaustion.
    pub async fn run(&self) -> WorkerResult<RunStats> {
        let run_id = RunId::new();
        info!(run_id = %run_id, "Starting transfer run");

        let completed = self.ledger.load_completed().await;
        info!("{} videos already transferred", completed.len());

        let files = self.disk.list_files().await?;
        let candidates: Vec<RemoteFile> = files
            .into_iter()
            .filter(|f| f.has_extension(&self.config.extension))
            .collect();
        info!(
            "Found {} {} files to process",
            candidates.len(),
            self.config.extension
        );

        if candidates.is_empty() {
            info!("No files to transfer");
            return Ok(RunStats::default());
        }

        let mut stats = RunStats::default();

        for file in &candidates {
            if completed.contains(&file.name) {
                info!(file = %file.name, "Skipping, already transferred");
                continue;
            }

            info!(
                file = %file.name,
                size_mb = file.size as f64 / (1024.0 * 1024.0),
                "Processing file"
            );

            match self.transfer_one(file).await {
                Ok(()) => stats.record_success(),
                Err(e) if e.is_fatal() => {
                    error!(file = %file.name, error = %e, "Aborting run");
                    return Err(e);
                }
                Err(e) => {
                    error!(file = %file.name, error = %e, "Transfer failed, continuing");
                    stats.record_failure();
                }
            }
        }

        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Transfer run complete"
        );
        Ok(stats)
    }

    /// Transfer a single file end to end.
    ///
    /// The local copy is deleted only after the ledger records the
    /// upload; on upload failure it is retained for manual inspection.
    async fn transfer_one(&self, file: &RemoteFile) -> WorkerResult<()> {
        let url = self.disk.download_url(&file.path).await?;
        let local_path = self.config.work_dir.join(&file.name);
        self.disk.download(&url, &local_path).await?;

        let video_id = self.uploader.upload_video(&local_path, file.stem()).await?;
        self.ledger.record(&file.name, video_id).await?;

        match tokio::fs::remove_file(&local_path).await {
            Ok(()) => info!(path = %local_path.display(), "Deleted local file"),
            Err(e) => warn!(
                path = %local_path.display(),
                error = %e,
                "Could not delete local file"
            ),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use disktube_disk::DiskConfig;
    use disktube_models::LedgerDocument;
    use disktube_youtube::YoutubeError;

    use crate::error::WorkerError;

    fn worker_config(dir: &tempfile::TempDir) -> WorkerConfig {
        WorkerConfig {
            public_key: "TestKey".to_string(),
            yandex_oauth_token: None,
            client_secrets_file: PathBuf::from("client_secret.json"),
            token_file: dir.path().join("token.json"),
            ledger_path: dir.path().join("uploaded_videos.json"),
            extension: ".mov".to_string(),
            work_dir: dir.path().join("work"),
            log_file: dir.path().join("transfer.log"),
        }
    }

    fn disk_client(server: &MockServer) -> DiskClient {
        let mut config = DiskConfig::new("TestKey", None);
        config.base_url = server.uri();
        config.retry.delay_unit = std::time::Duration::from_millis(1);
        DiskClient::new(config).unwrap()
    }

    fn run_with(
        server: &MockServer,
        dir: &tempfile::TempDir,
        uploader: MockVideoUploader,
    ) -> TransferRun {
        TransferRun::new(
            worker_config(dir),
            disk_client(server),
            Box::new(uploader),
            Ledger::new(dir.path().join("uploaded_videos.json")),
        )
    }

    async fn mount_listing(server: &MockServer, items: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/public/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": {"items": items}
            })))
            .mount(server)
            .await;
    }

    async fn mount_download(server: &MockServer, remote_path: &str, href_path: &str) {
        Mock::given(method("GET"))
            .and(path("/public/resources/download"))
            .and(query_param("path", remote_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "href": format!("{}{}", server.uri(), href_path)
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(href_path.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video-bytes".to_vec()))
            .mount(server)
            .await;
    }

    fn file_item(name: &str) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "path": format!("/{}", name),
            "type": "file",
            "size": 11
        })
    }

    #[tokio::test]
    async fn test_empty_listing_exits_cleanly() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_listing(&server, serde_json::json!([])).await;

        let uploader = MockVideoUploader::new();
        let run = run_with(&server, &dir, uploader);

        let stats = run.run().await.unwrap();
        assert_eq!(stats, RunStats::default());
        // Ledger stays untouched: not even created.
        assert!(!dir.path().join("uploaded_videos.json").exists());
    }

    #[tokio::test]
    async fn test_non_matching_extensions_are_ignored() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_listing(
            &server,
            serde_json::json!([file_item("notes.txt"), file_item("clip.mp4")]),
        )
        .await;

        let uploader = MockVideoUploader::new(); // no expectations: never called
        let run = run_with(&server, &dir, uploader);

        let stats = run.run().await.unwrap();
        assert_eq!(stats.attempted(), 0);
    }

    #[tokio::test]
    async fn test_ledger_entries_are_skipped_without_download() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_listing(
            &server,
            serde_json::json!([file_item("done.mov"), file_item("new.mov")]),
        )
        .await;
        // Only new.mov may be resolved and downloaded.
        mount_download(&server, "/new.mov", "/dl/new").await;

        std::fs::write(
            dir.path().join("uploaded_videos.json"),
            r#"{"uploaded_files": ["done.mov"],
                "videos": {"done.mov": {"video_id": "vid-done", "uploaded_at": "2024-11-20 08:00:00"}}}"#,
        )
        .unwrap();

        let mut uploader = MockVideoUploader::new();
        uploader
            .expect_upload_video()
            .withf(|_, title| title == "new")
            .times(1)
            .returning(|_, _| Ok(VideoId::from("vid-new")));

        let run = run_with(&server, &dir, uploader);
        let stats = run.run().await.unwrap();

        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 0);

        // Prior entry preserved unmodified, new entry added.
        let doc: LedgerDocument = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("uploaded_videos.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(doc.videos["done.mov"].video_id, VideoId::from("vid-done"));
        assert_eq!(doc.videos["done.mov"].uploaded_at, "2024-11-20 08:00:00");
        assert_eq!(doc.videos["new.mov"].video_id, VideoId::from("vid-new"));
    }

    #[tokio::test]
    async fn test_successful_transfer_deletes_local_file() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_listing(&server, serde_json::json!([file_item("clip.mov")])).await;
        mount_download(&server, "/clip.mov", "/dl/clip").await;

        let mut uploader = MockVideoUploader::new();
        uploader
            .expect_upload_video()
            .times(1)
            .returning(|_, _| Ok(VideoId::from("vid-1")));

        let run = run_with(&server, &dir, uploader);
        let stats = run.run().await.unwrap();

        assert_eq!(stats.succeeded, 1);
        assert!(!dir.path().join("work").join("clip.mov").exists());
    }

    #[tokio::test]
    async fn test_failed_upload_retains_file_and_skips_ledger() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_listing(&server, serde_json::json!([file_item("clip.mov")])).await;
        mount_download(&server, "/clip.mov", "/dl/clip").await;

        let mut uploader = MockVideoUploader::new();
        uploader
            .expect_upload_video()
            .times(1)
            .returning(|_, _| Err(YoutubeError::UploadFailed("server sad".to_string())));

        let run = run_with(&server, &dir, uploader);
        let stats = run.run().await.unwrap();

        assert_eq!(stats.succeeded, 0);
        assert_eq!(stats.failed, 1);
        // Retained for manual inspection.
        assert!(dir.path().join("work").join("clip.mov").exists());
        assert!(!dir.path().join("uploaded_videos.json").exists());
    }

    #[tokio::test]
    async fn test_quota_aborts_run_immediately() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_listing(
            &server,
            serde_json::json!([file_item("first.mov"), file_item("second.mov")]),
        )
        .await;
        mount_download(&server, "/first.mov", "/dl/first").await;

        let mut uploader = MockVideoUploader::new();
        uploader
            .expect_upload_video()
            .times(1)
            .returning(|_, _| Err(YoutubeError::QuotaExceeded("daily limit".to_string())));

        let run = run_with(&server, &dir, uploader);
        let err = run.run().await.unwrap_err();

        assert!(err.is_fatal());
        // No ledger entry, local file retained, second file never touched.
        assert!(!dir.path().join("uploaded_videos.json").exists());
        assert!(dir.path().join("work").join("first.mov").exists());
    }

    #[tokio::test]
    async fn test_link_failure_counts_and_continues() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_listing(
            &server,
            serde_json::json!([file_item("broken.mov"), file_item("good.mov")]),
        )
        .await;
        // broken.mov link resolution fails; good.mov goes through.
        Mock::given(method("GET"))
            .and(path("/public/resources/download"))
            .and(query_param("path", "/broken.mov"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_download(&server, "/good.mov", "/dl/good").await;

        let mut uploader = MockVideoUploader::new();
        uploader
            .expect_upload_video()
            .withf(|_, title| title == "good")
            .times(1)
            .returning(|_, _| Ok(VideoId::from("vid-good")));

        let run = run_with(&server, &dir, uploader);
        let stats = run.run().await.unwrap();

        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_fails_the_run() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/public/resources"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let run = run_with(&server, &dir, MockVideoUploader::new());
        let err = run.run().await.unwrap_err();
        assert!(matches!(err, WorkerError::Disk(_)));
        assert!(!err.is_fatal());
    }
}
