//! Wire types for the YouTube upload API.

use serde::{Deserialize, Serialize};

/// Content type sent for uploaded videos.
pub const VIDEO_MIME_TYPE: &str = "video/quicktime";

/// Fixed category for all uploads (People & Blogs).
pub const CATEGORY_PEOPLE_AND_BLOGS: &str = "22";

/// Fixed tag set attached to every upload.
pub const UPLOAD_TAGS: [&str; 2] = ["Yandex Disk", "API Upload"];

/// Metadata envelope sent when initiating a resumable upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub snippet: Snippet,
    pub status: PrivacyState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(rename = "categoryId")]
    pub category_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyState {
    #[serde(rename = "privacyStatus")]
    pub privacy_status: String,
}

impl UploadMetadata {
    /// Fixed metadata for a transfer: generated description referencing
    /// the source filename, fixed tags and category, public visibility.
    pub fn for_file(title: impl Into<String>, source_filename: &str) -> Self {
        Self {
            snippet: Snippet {
                title: title.into(),
                description: format!("Uploaded from Yandex Disk: {}", source_filename),
                tags: UPLOAD_TAGS.iter().map(|t| t.to_string()).collect(),
                category_id: CATEGORY_PEOPLE_AND_BLOGS.to_string(),
            },
            status: PrivacyState {
                privacy_status: "public".to_string(),
            },
        }
    }
}

/// Final response of a completed upload. The `id` field is the contract;
/// a success response without it is a protocol violation.
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub id: Option<String>,
}

/// Error envelope returned by the API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorItem {
    pub reason: Option<String>,
}

impl ApiErrorEnvelope {
    /// The first error reason, the field the platform uses to signal
    /// quota and rate-limit conditions.
    pub fn primary_reason(&self) -> Option<&str> {
        self.error
            .errors
            .first()
            .and_then(|e| e.reason.as_deref())
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }
}
