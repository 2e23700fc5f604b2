use async_trait::async_trait;
use image::DynamicImage;

use crate::storage::errors::StorageError;
use crate::storage::imaging::{decode_image, encode_png};
use crate::storage::types::{ManifestIndex, StoredBlob, blob_file_name, split_blob_uri};

use super::types::{InMemoryPhotoStorage, MemoryState, PhotoStorage};

const SCHEME: &str = "mem";

impl InMemoryPhotoStorage {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory photo storage");
        Self::default()
    }

    /// Simulate an outage: every call fails with `Remote` while unavailable.
    pub async fn set_available(&self, available: bool) {
        self.state.lock().await.unavailable = !available;
    }

    pub async fn blob_count(&self) -> usize {
        self.state.lock().await.blobs.len()
    }

    /// Number of successful manifest saves so far
    pub async fn manifest_writes(&self) -> usize {
        self.state.lock().await.manifest_writes
    }

    /// Stored manifest, bypassing the availability switch
    pub async fn manifest_snapshot(&self) -> Option<ManifestIndex> {
        let state = self.state.lock().await;
        state
            .manifest
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    }
}

fn ensure_available(state: &MemoryState) -> Result<(), StorageError> {
    if state.unavailable {
        return Err(StorageError::Remote("storage unavailable".to_string()));
    }
    Ok(())
}

#[async_trait]
impl PhotoStorage for InMemoryPhotoStorage {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    async fn save_blob(
        &self,
        session: &str,
        photo_id: u64,
        image: &DynamicImage,
    ) -> Result<StoredBlob, StorageError> {
        let png = encode_png(image)?;
        let mut state = self.state.lock().await;
        ensure_available(&state)?;

        let key = format!("{session}/{}", blob_file_name(photo_id));
        state.blobs.insert(key.clone(), png);
        Ok(StoredBlob {
            uri: format!("{SCHEME}://{key}"),
            file_id: None,
        })
    }

    async fn load_blob(&self, uri: &str) -> Result<DynamicImage, StorageError> {
        let key = split_blob_uri(uri, SCHEME)?;
        let state = self.state.lock().await;
        ensure_available(&state)?;

        let bytes = state
            .blobs
            .get(key)
            .ok_or_else(|| StorageError::NotFound(uri.to_string()))?;
        decode_image(bytes)
    }

    async fn remove_blob(&self, uri: &str) -> Result<(), StorageError> {
        let key = split_blob_uri(uri, SCHEME)?;
        let mut state = self.state.lock().await;
        ensure_available(&state)?;

        state
            .blobs
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(uri.to_string()))
    }

    async fn fetch_manifest(&self) -> Result<Option<ManifestIndex>, StorageError> {
        let state = self.state.lock().await;
        ensure_available(&state)?;

        match &state.manifest {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn save_manifest(&self, index: &ManifestIndex) -> Result<(), StorageError> {
        let json = serde_json::to_string(index)?;
        let mut state = self.state.lock().await;
        ensure_available(&state)?;

        state.manifest = Some(json);
        state.manifest_writes += 1;
        Ok(())
    }
}
