//! End-to-end transfer flow against mocked disk and upload endpoints.
//!
//! Drives `TransferRun` with the real clients (only the interactive
//! auth flow is substituted) to cover the cross-crate scenarios: a
//! rate-limited first upload attempt that succeeds on retry, and quota
//! exhaustion aborting the run.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use disktube_disk::{DiskClient, DiskConfig};
use disktube_ledger::Ledger;
use disktube_models::{LedgerDocument, VideoId};
use disktube_worker::{TransferRun, WorkerConfig};
use disktube_youtube::{
    auth::{AuthFlow, CredentialStore, InstalledSecrets, StoredCredential, YOUTUBE_UPLOAD_SCOPE},
    Authenticator, ResumableUploadConfig, UploadRetryConfig, YoutubeClient, YoutubeConfig,
    YoutubeResult,
};

/// The interactive flow must never run in tests.
struct PanicFlow;

#[async_trait]
impl AuthFlow for PanicFlow {
    async fn authorize(
        &self,
        _secrets: &InstalledSecrets,
        _http: &reqwest::Client,
    ) -> YoutubeResult<StoredCredential> {
        panic!("interactive flow invoked in test");
    }
}

fn worker_config(dir: &tempfile::TempDir) -> WorkerConfig {
    WorkerConfig {
        public_key: "TestKey".to_string(),
        yandex_oauth_token: None,
        client_secrets_file: dir.path().join("client_secret.json"),
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
    config.retry.delay_unit = Duration::from_millis(1);
    DiskClient::new(config).unwrap()
}

async fn youtube_client(server: &MockServer, dir: &tempfile::TempDir) -> YoutubeClient {
    let store = CredentialStore::new(dir.path().join("token.json"));
    store
        .save(&StoredCredential {
            access_token: "valid-token".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_uri: "https://unused.example/token".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scopes: vec![YOUTUBE_UPLOAD_SCOPE.to_string()],
            expiry: Some(Utc::now() + ChronoDuration::hours(1)),
        })
        .await
        .unwrap();

    let authenticator = Authenticator::new(
        reqwest::Client::new(),
        InstalledSecrets {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            auth_uri: "https://unused.example/auth".to_string(),
            token_uri: "https://unused.example/token".to_string(),
            redirect_uris: vec![],
        },
        store,
        Box::new(PanicFlow),
    );

    let config = YoutubeConfig {
        upload_base_url: server.uri(),
        connect_timeout: Duration::from_secs(5),
        retry: UploadRetryConfig {
            max_attempts: 3,
            delay_unit: Duration::from_millis(1),
        },
        resumable: ResumableUploadConfig {
            chunk_size: 1024,
            max_retries: 3,
            backoff_unit: Duration::from_millis(1),
        },
    };

    YoutubeClient::new(config, authenticator).unwrap()
}

async fn mount_disk_with_one_file(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/public/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_embedded": {"items": [
                {"name": "clip.mov", "path": "/clip.mov", "type": "file", "size": 16}
            ]}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public/resources/download"))
        .and(query_param("path", "/clip.mov"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "href": format!("{}/dl/clip", server.uri())
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dl/clip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake video bytes".to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn rate_limited_upload_succeeds_on_second_attempt() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_disk_with_one_file(&server).await;

    // First initiation is rate limited, the retry opens a session.
    Mock::given(method("POST"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(403).set_body_raw(
            r#"{"error": {"code": 403, "message": "slow down",
                "errors": [{"reason": "rateLimitExceeded"}]}}"#,
            "application/json",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/videos"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Location", format!("{}/session", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"id": "vid-e2e"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let config = worker_config(&dir);
    let ledger = Ledger::new(&config.ledger_path);
    let run = TransferRun::new(
        config,
        disk_client(&server),
        Box::new(youtube_client(&server, &dir).await),
        ledger,
    );

    let stats = run.run().await.unwrap();
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 0);

    // Ledger gained exactly one entry, local file was deleted.
    let doc: LedgerDocument = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("uploaded_videos.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(doc.uploaded_files, vec!["clip.mov".to_string()]);
    assert_eq!(doc.videos["clip.mov"].video_id, VideoId::from("vid-e2e"));
    assert!(!dir.path().join("work").join("clip.mov").exists());
}

#[tokio::test]
async fn quota_exhaustion_aborts_with_file_retained() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_disk_with_one_file(&server).await;

    Mock::given(method("POST"))
        .and(path("/videos"))
        .respond_with(ResponseTemplate::new(403).set_body_raw(
            r#"{"error": {"code": 403, "message": "daily quota",
                "errors": [{"reason": "quotaExceeded"}]}}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let config = worker_config(&dir);
    let ledger = Ledger::new(&config.ledger_path);
    let run = TransferRun::new(
        config,
        disk_client(&server),
        Box::new(youtube_client(&server, &dir).await),
        ledger,
    );

    let err = run.run().await.unwrap_err();
    assert!(err.is_fatal());

    // No ledger entry; the downloaded file stays for the next run.
    assert!(!dir.path().join("uploaded_videos.json").exists());
    assert!(dir.path().join("work").join("clip.mov").exists());
}
