//! YouTube video identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a video on the hosting platform, as returned by a
/// successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_serde_transparent() {
        let id = VideoId::from("dQw4w9WgXcQ");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"dQw4w9WgXcQ\"");

        let back: VideoId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_video_id_display() {
        assert_eq!(VideoId::from_string("abc123").to_string(), "abc123");
    }
}
