//! Remote file listing models.

use serde::{Deserialize, Serialize};

/// A file entry from the remote shared-folder listing.
///
/// Only entries whose type is `file` are ever materialized as
/// `RemoteFile`; directories are filtered out at the client boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// File name, including extension.
    pub name: String,
    /// Remote identifier used to resolve a download link.
    pub path: String,
    /// File size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl RemoteFile {
    /// True if the file name ends with `extension`, case-insensitively.
    pub fn has_extension(&self, extension: &str) -> bool {
        self.name
            .to_lowercase()
            .ends_with(&extension.to_lowercase())
    }

    /// File name without its final extension, used as the upload title.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> RemoteFile {
        RemoteFile {
            name: name.to_string(),
            path: format!("/{}", name),
            size: 0,
        }
    }

    #[test]
    fn test_has_extension_case_insensitive() {
        assert!(file("clip.mov").has_extension(".mov"));
        assert!(file("CLIP.MOV").has_extension(".mov"));
        assert!(file("clip.Mov").has_extension(".MOV"));
        assert!(!file("clip.mp4").has_extension(".mov"));
        assert!(!file("mov").has_extension(".mov"));
    }

    #[test]
    fn test_stem() {
        assert_eq!(file("holiday.mov").stem(), "holiday");
        assert_eq!(file("two.dots.mov").stem(), "two.dots");
        assert_eq!(file("noext").stem(), "noext");
        assert_eq!(file(".hidden").stem(), ".hidden");
    }
}
