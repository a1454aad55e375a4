//! Wire types for the Yandex Disk public resources API.

use serde::Deserialize;

use disktube_models::RemoteFile;

/// Response of `GET /public/resources`.
#[derive(Debug, Deserialize)]
pub struct PublicResourcesResponse {
    #[serde(rename = "_embedded")]
    pub embedded: Option<Embedded>,
}

/// The `_embedded` envelope around the item list.
#[derive(Debug, Deserialize)]
pub struct Embedded {
    #[serde(default)]
    pub items: Vec<ResourceItem>,
}

/// One entry of a folder listing. May be a file or a directory.
#[derive(Debug, Deserialize)]
pub struct ResourceItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
}

impl ResourceItem {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }

    pub fn into_remote_file(self) -> RemoteFile {
        RemoteFile {
            name: self.name,
            path: self.path,
            size: self.size,
        }
    }
}

/// Response of `GET /public/resources/download`.
#[derive(Debug, Deserialize)]
pub struct DownloadLinkResponse {
    pub href: String,
}
