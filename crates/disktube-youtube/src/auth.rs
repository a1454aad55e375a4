//! OAuth credential bootstrap.
//!
//! Authentication follows the installed-app flow:
//! - A persisted credential is reused while valid
//! - An expired credential with a refresh token is refreshed silently
//! - Otherwise an interactive authorization flow runs: a loopback
//!   redirect listener when one can be bound, manual console code entry
//!   as the fallback
//!
//! The interactive flow is a capability the client depends on but does
//! not drive itself; it is injected so tests can substitute a
//! non-interactive provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::{YoutubeError, YoutubeResult};

/// OAuth scope required for uploads.
pub const YOUTUBE_UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

/// Refresh margin: a credential within this window of expiry counts as
/// expired so it cannot lapse mid-upload.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Redirect target for the manual console flow.
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

// =============================================================================
// Client secrets
// =============================================================================

/// The downloaded client-secret JSON (`{"installed": {...}}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub installed: InstalledSecrets,
}

/// Installed-app OAuth client registration.
#[derive(Debug, Clone, Deserialize)]
pub struct InstalledSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl ClientSecrets {
    /// Load client secrets from disk. A missing file is an unrecoverable
    /// startup condition; the caller is expected to exit.
    pub async fn load(path: &Path) -> YoutubeResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            YoutubeError::auth_error(format!(
                "Client secrets file not found at {}: {}. \
                 Download it from the API console.",
                path.display(),
                e
            ))
        })?;
        let secrets: ClientSecrets = serde_json::from_str(&content)
            .map_err(|e| YoutubeError::auth_error(format!("Invalid client secrets: {}", e)))?;
        Ok(secrets)
    }
}

// =============================================================================
// Stored credential
// =============================================================================

/// The persisted authorized-user credential file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredCredential {
    /// Expired (or about to expire within the refresh margin). A missing
    /// expiry counts as usable; a stale token surfaces as a 401 and is
    /// refreshed then.
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= expiry,
            None => false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    /// Build the credential to persist, carrying the previous refresh
    /// token forward when the response omits one.
    fn into_credential(
        self,
        secrets: &InstalledSecrets,
        previous_refresh_token: Option<String>,
    ) -> StoredCredential {
        StoredCredential {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh_token),
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes: vec![YOUTUBE_UPLOAD_SCOPE.to_string()],
            expiry: self
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        }
    }
}

// =============================================================================
// Credential store
// =============================================================================

/// On-disk persistence for the authorized-user credential.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the stored credential; absent or unreadable state yields
    /// `None` and is logged, never an error.
    pub async fn load(&self) -> Option<StoredCredential> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored credential");
                return None;
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not read stored credential"
                );
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(cred) => Some(cred),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Stored credential is invalid, re-authorizing"
                );
                None
            }
        }
    }

    /// Persist the credential with write-then-rename.
    pub async fn save(&self, credential: &StoredCredential) -> YoutubeResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(credential)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// =============================================================================
// Interactive flow
// =============================================================================

/// Interactive authorization capability.
///
/// Implementations may require human interaction and are exempt from
/// automatic retry.
#[async_trait]
pub trait AuthFlow: Send + Sync {
    async fn authorize(
        &self,
        secrets: &InstalledSecrets,
        http: &Client,
    ) -> YoutubeResult<StoredCredential>;
}

/// Real interactive flow: loopback redirect listener first, manual
/// console code entry when the listener cannot be bound.
pub struct InstalledFlow;

#[async_trait]
impl AuthFlow for InstalledFlow {
    async fn authorize(
        &self,
        secrets: &InstalledSecrets,
        http: &Client,
    ) -> YoutubeResult<StoredCredential> {
        match TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => self.loopback_flow(secrets, http, listener).await,
            Err(e) => {
                warn!(error = %e, "Could not bind loopback listener, using console flow");
                self.console_flow(secrets, http).await
            }
        }
    }
}

impl InstalledFlow {
    /// Consent URL for the given redirect target.
    fn consent_url(secrets: &InstalledSecrets, redirect_uri: &str) -> YoutubeResult<Url> {
        let mut url = Url::parse(&secrets.auth_uri)
            .map_err(|e| YoutubeError::auth_error(format!("Invalid auth_uri: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &secrets.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", YOUTUBE_UPLOAD_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url)
    }

    /// Serve one redirect request and extract the authorization code.
    async fn loopback_flow(
        &self,
        secrets: &InstalledSecrets,
        http: &Client,
        listener: TcpListener,
    ) -> YoutubeResult<StoredCredential> {
        let port = listener
            .local_addr()
            .map_err(YoutubeError::Io)?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{}", port);
        let url = Self::consent_url(secrets, &redirect_uri)?;

        println!("Open this URL in your browser to authorize the upload client:");
        println!("\n  {}\n", url);
        info!("Waiting for authorization redirect on {}", redirect_uri);

        let (mut stream, _) = listener.accept().await?;
        let mut reader = BufReader::new(&mut stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;

        let code = parse_auth_code(&request_line).ok_or_else(|| {
            YoutubeError::auth_error("Authorization redirect carried no code parameter")
        })?;

        let body = "Authorization complete. You can close this window.";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.ok();

        self.exchange_code(secrets, http, &code, &redirect_uri).await
    }

    /// Print the consent URL and read the code from stdin.
    async fn console_flow(
        &self,
        secrets: &InstalledSecrets,
        http: &Client,
    ) -> YoutubeResult<StoredCredential> {
        let url = Self::consent_url(secrets, OOB_REDIRECT_URI)?;

        println!("Open this URL in your browser, then paste the code shown:");
        println!("\n  {}\n", url);

        let mut reader = BufReader::new(tokio::io::stdin());
        let mut code = String::new();
        reader.read_line(&mut code).await?;
        let code = code.trim();
        if code.is_empty() {
            return Err(YoutubeError::auth_error("Empty authorization code"));
        }

        self.exchange_code(secrets, http, code, OOB_REDIRECT_URI).await
    }

    /// Exchange an authorization code at the token endpoint.
    async fn exchange_code(
        &self,
        secrets: &InstalledSecrets,
        http: &Client,
        code: &str,
        redirect_uri: &str,
    ) -> YoutubeResult<StoredCredential> {
        let response = http
            .post(&secrets.token_uri)
            .form(&[
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::auth_error(format!(
                "Code exchange returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        info!("Authorized upload client");
        Ok(token.into_credential(secrets, None))
    }
}

/// Extract the `code` query parameter from an HTTP request line like
/// `GET /?code=4%2FXYZ&scope=... HTTP/1.1`.
fn parse_auth_code(request_line: &str) -> Option<String> {
    let path = request_line.split_whitespace().nth(1)?;
    let query = path.split_once('?')?.1;
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("code=") {
            let decoded = percent_decode(value);
            if !decoded.is_empty() {
                return Some(decoded);
            }
        }
    }
    None
}

/// Minimal percent-decoding for query parameter values.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match hex {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

// =============================================================================
// Authenticator
// =============================================================================

/// Credential lifecycle: load, refresh, interactive authorization,
/// persistence.
pub struct Authenticator {
    http: Client,
    secrets: InstalledSecrets,
    store: CredentialStore,
    flow: Box<dyn AuthFlow>,
}

impl Authenticator {
    pub fn new(
        http: Client,
        secrets: InstalledSecrets,
        store: CredentialStore,
        flow: Box<dyn AuthFlow>,
    ) -> Self {
        Self {
            http,
            secrets,
            store,
            flow,
        }
    }

    /// A bearer token valid for upload calls.
    ///
    /// Loads the persisted credential when present, refreshes it when
    /// expired and refresh-capable, and only then falls back to the
    /// interactive flow. The result is always persisted for the next run.
    pub async fn access_token(&self) -> YoutubeResult<String> {
        if let Some(credential) = self.store.load().await {
            if !credential.is_expired() {
                return Ok(credential.access_token);
            }

            if credential.can_refresh() {
                match self.refresh(&credential).await {
                    Ok(refreshed) => {
                        self.store.save(&refreshed).await?;
                        return Ok(refreshed.access_token);
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not refresh credentials");
                    }
                }
            }
        }

        self.authorize_interactively().await
    }

    /// Force a new token, used after the API rejects the current one.
    ///
    /// Tries a silent refresh first; falls back to the interactive flow.
    pub async fn force_refresh(&self) -> YoutubeResult<String> {
        if let Some(credential) = self.store.load().await {
            if credential.can_refresh() {
                match self.refresh(&credential).await {
                    Ok(refreshed) => {
                        self.store.save(&refreshed).await?;
                        return Ok(refreshed.access_token);
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not refresh rejected credentials");
                    }
                }
            }
        }

        self.authorize_interactively().await
    }

    async fn authorize_interactively(&self) -> YoutubeResult<String> {
        let credential = self.flow.authorize(&self.secrets, &self.http).await?;
        self.store.save(&credential).await?;
        info!("Authenticated with upload platform");
        Ok(credential.access_token)
    }

    /// Refresh an expired credential at the token endpoint.
    async fn refresh(&self, credential: &StoredCredential) -> YoutubeResult<StoredCredential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| YoutubeError::auth_error("No refresh token"))?;

        let response = self
            .http
            .post(&credential.token_uri)
            .form(&[
                ("client_id", credential.client_id.as_str()),
                ("client_secret", credential.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::auth_error(format!(
                "Token refresh returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        debug!("Refreshed upload credentials");

        Ok(StoredCredential {
            access_token: token.access_token,
            refresh_token: token
                .refresh_token
                .or_else(|| credential.refresh_token.clone()),
            token_uri: credential.token_uri.clone(),
            client_id: credential.client_id.clone(),
            client_secret: credential.client_secret.clone(),
            scopes: credential.scopes.clone(),
            expiry: token
                .expires_in
                .map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        })
    }
}
