use async_trait::async_trait;
use image::DynamicImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::storage::errors::StorageError;
use crate::storage::types::{ManifestIndex, StoredBlob};

/// In-process store used for tests and the `memory` backend.
///
/// Clones share the same contents, so a test can keep a handle after
/// handing the store to a `PhotoStore`.
#[derive(Clone, Default)]
pub struct InMemoryPhotoStorage {
    pub(super) state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
pub(super) struct MemoryState {
    pub(super) blobs: HashMap<String, Vec<u8>>,
    pub(super) manifest: Option<String>,
    pub(super) unavailable: bool,
    pub(super) manifest_writes: usize,
}

/// Blobs and manifest under a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFolderStorage {
    pub(super) base: PathBuf,
}

/// Google Drive v3 backend.
pub struct GoogleDriveStorage {
    pub(super) client: reqwest::Client,
    pub(super) api_url: String,
    pub(super) upload_url: String,
    pub(super) root_folder: String,
    pub(super) access_token: RwLock<String>,
    /// `"<parent id or root>:<name>"` -> folder id, kept for the process lifetime
    pub(super) folder_cache: Mutex<HashMap<String, String>>,
}

/// Remote blob store plus manifest, addressed by `<scheme>://<opaque id>` URIs.
#[async_trait]
pub trait PhotoStorage: Send + Sync + 'static {
    /// URI scheme owned by this adapter
    fn scheme(&self) -> &'static str;

    /// Save `image` as PNG under the session's folder, replacing an existing
    /// blob of the same name.
    async fn save_blob(
        &self,
        session: &str,
        photo_id: u64,
        image: &DynamicImage,
    ) -> Result<StoredBlob, StorageError>;

    /// Fails with `InvalidUri` when `uri` has another scheme.
    async fn load_blob(&self, uri: &str) -> Result<DynamicImage, StorageError>;

    async fn remove_blob(&self, uri: &str) -> Result<(), StorageError>;

    /// The stored manifest, or `None` if none was ever saved.
    async fn fetch_manifest(&self) -> Result<Option<ManifestIndex>, StorageError>;

    /// Overwrite the stored manifest wholesale.
    async fn save_manifest(&self, index: &ManifestIndex) -> Result<(), StorageError>;

    /// Replace the credential used for remote calls. No-op for local backends.
    async fn update_access_token(&self, _access_token: &str) {}

    /// The stored manifest, or an empty one when none exists or it cannot
    /// be read.
    async fn load_manifest(&self) -> ManifestIndex {
        match self.fetch_manifest().await {
            Ok(Some(index)) => index,
            Ok(None) => {
                tracing::info!("No manifest in {} storage; starting empty", self.scheme());
                ManifestIndex::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load manifest: {}; starting empty", e);
                ManifestIndex::default()
            }
        }
    }

    /// Best-effort delete, `false` on any failure.
    async fn delete_blob(&self, uri: &str) -> bool {
        match self.remove_blob(uri).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to delete blob {}: {}", uri, e);
                false
            }
        }
    }
}
