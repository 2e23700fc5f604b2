use async_trait::async_trait;
use image::DynamicImage;
use std::path::{Component, Path, PathBuf};

use crate::storage::errors::StorageError;
use crate::storage::imaging::{decode_image, encode_png};
use crate::storage::types::{
    MANIFEST_FILE_NAME, META_FOLDER_NAME, ManifestIndex, StoredBlob, blob_file_name,
    split_blob_uri,
};

use super::types::{LocalFolderStorage, PhotoStorage};

const SCHEME: &str = "local";

impl LocalFolderStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        tracing::info!("Using local photo storage at {}", base.display());
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn manifest_path(&self) -> PathBuf {
        self.base.join(META_FOLDER_NAME).join(MANIFEST_FILE_NAME)
    }

    /// Resolve a blob URI's relative path under the base directory.
    fn resolve(&self, uri: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(split_blob_uri(uri, SCHEME)?);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidUri(uri.to_string()));
        }
        Ok(self.base.join(relative))
    }
}

/// Session names become directory names; path separators are replaced.
/// Names starting with `_` get one more `_` so no session folder can be the
/// manifest folder.
fn session_dir_name(session: &str) -> Result<String, StorageError> {
    let mut name: String = session
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    if name.is_empty() || name == "." || name == ".." {
        return Err(StorageError::Io(format!(
            "session name {session:?} cannot be used as a folder"
        )));
    }
    if name.starts_with('_') {
        name.insert(0, '_');
    }
    Ok(name)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl PhotoStorage for LocalFolderStorage {
    fn scheme(&self) -> &'static str {
        SCHEME
    }

    async fn save_blob(
        &self,
        session: &str,
        photo_id: u64,
        image: &DynamicImage,
    ) -> Result<StoredBlob, StorageError> {
        let relative = format!("{}/{}", session_dir_name(session)?, blob_file_name(photo_id));
        let png = encode_png(image)?;
        write_atomic(&self.base.join(&relative), &png).await?;

        tracing::debug!("Saved photo {} to {}", photo_id, relative);
        Ok(StoredBlob {
            uri: format!("{SCHEME}://{relative}"),
            file_id: None,
        })
    }

    async fn load_blob(&self, uri: &str) -> Result<DynamicImage, StorageError> {
        let path = self.resolve(uri)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(uri.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        decode_image(&bytes)
    }

    async fn remove_blob(&self, uri: &str) -> Result<(), StorageError> {
        let path = self.resolve(uri)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(uri.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_manifest(&self) -> Result<Option<ManifestIndex>, StorageError> {
        match tokio::fs::read(self.manifest_path()).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_manifest(&self, index: &ManifestIndex) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(index)?;
        write_atomic(&self.manifest_path(), &json).await
    }
}
