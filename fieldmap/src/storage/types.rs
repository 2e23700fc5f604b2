use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::StorageError;

pub const MANIFEST_VERSION: &str = "1.0";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
/// Folder that holds the manifest, next to the session folders
pub const META_FOLDER_NAME: &str = "_meta";

/// Remote record of every session and photo, without image bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestIndex {
    #[serde(default)]
    pub sessions: BTreeMap<String, Vec<PhotoMeta>>,
    #[serde(default)]
    pub photo_counter: u64,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for ManifestIndex {
    fn default() -> Self {
        Self {
            sessions: BTreeMap::new(),
            photo_counter: 0,
            version: default_version(),
        }
    }
}

impl ManifestIndex {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.photo_counter == 0
    }

    pub fn total_photos(&self) -> usize {
        self.sessions.values().map(Vec::len).sum()
    }

    /// Highest photo id recorded in any session
    pub fn max_photo_id(&self) -> Option<u64> {
        self.sessions.values().flatten().map(|p| p.id).max()
    }
}

fn default_version() -> String {
    MANIFEST_VERSION.to_string()
}

/// Metadata-only projection of a photo.
///
/// Every field except `id` has a default so manifests written by older
/// versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoMeta {
    pub id: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub has_annotations: bool,
    #[serde(default)]
    pub source_photo_id: Option<u64>,
    #[serde(default = "default_variant")]
    pub variant: String,
    #[serde(default)]
    pub storage_uri: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub thumb_data_url: Option<String>,
}

pub const VARIANT_ORIGINAL: &str = "original";
pub const VARIANT_ANNOTATED: &str = "annotated";

fn default_variant() -> String {
    VARIANT_ORIGINAL.to_string()
}

/// Where a saved blob ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// `<scheme>://<opaque id>`
    pub uri: String,
    /// Remote file handle, when the backend has one
    pub file_id: Option<String>,
}

/// Canonical blob file name for a photo
pub fn blob_file_name(photo_id: u64) -> String {
    format!("photo_{photo_id}.png")
}

/// The opaque id of `uri`, or `InvalidUri` if its scheme is not `scheme`.
pub fn split_blob_uri<'a>(uri: &'a str, scheme: &str) -> Result<&'a str, StorageError> {
    uri.strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix("://"))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StorageError::InvalidUri(uri.to_string()))
}
