use async_trait::async_trait;
use image::DynamicImage;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::storage::errors::StorageError;
use crate::storage::imaging::{decode_image, encode_png};
use crate::storage::types::{
    MANIFEST_FILE_NAME, META_FOLDER_NAME, ManifestIndex, StoredBlob, blob_file_name,
    split_blob_uri,
};

use super::config::DriveConfig;
use super::types::{GoogleDriveStorage, PhotoStorage};

const SCHEME: &str = "gdrive";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

impl GoogleDriveStorage {
    pub fn new(config: &DriveConfig, access_token: &str) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        tracing::info!(
            "Using Google Drive storage under folder {:?}",
            config.root_folder
        );
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            upload_url: config.upload_url.trim_end_matches('/').to_string(),
            root_folder: config.root_folder.clone(),
            access_token: RwLock::new(access_token.to_string()),
            folder_cache: Mutex::new(HashMap::new()),
        })
    }

    async fn bearer(&self) -> String {
        self.access_token.read().await.clone()
    }

    /// Id of the first non-trashed file or folder named `name` under `parent`.
    async fn find_file(
        &self,
        name: &str,
        parent: Option<&str>,
        folder: bool,
    ) -> Result<Option<String>, StorageError> {
        let query = build_search_query(name, parent, folder);
        let response = self
            .client
            .get(format!("{}/files", self.api_url))
            .bearer_auth(self.bearer().await)
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id,name)"),
            ])
            .send()
            .await?;

        let list: FileList = check_status(response).await?.json().await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String, StorageError> {
        let mut metadata = json!({ "name": name, "mimeType": FOLDER_MIME_TYPE });
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }

        let response = self
            .client
            .post(format!("{}/files", self.api_url))
            .bearer_auth(self.bearer().await)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await?;

        let file: DriveFile = check_status(response).await?.json().await?;
        tracing::debug!("Created Drive folder {:?} ({})", name, file.id);
        Ok(file.id)
    }

    /// Cached folder lookup; creates the folder when `create` is set.
    async fn folder_id(
        &self,
        name: &str,
        parent: Option<&str>,
        create: bool,
    ) -> Result<Option<String>, StorageError> {
        let cache_key = format!("{}:{}", parent.unwrap_or("root"), name);
        if let Some(id) = self.folder_cache.lock().await.get(&cache_key) {
            return Ok(Some(id.clone()));
        }

        let id = match self.find_file(name, parent, true).await? {
            Some(id) => id,
            None if create => self.create_folder(name, parent).await?,
            None => return Ok(None),
        };

        self.folder_cache.lock().await.insert(cache_key, id.clone());
        Ok(Some(id))
    }

    async fn ensure_folder(&self, name: &str, parent: Option<&str>) -> Result<String, StorageError> {
        self.folder_id(name, parent, true)
            .await?
            .ok_or_else(|| StorageError::Remote(format!("folder {name:?} could not be created")))
    }

    async fn root_folder_id(&self, create: bool) -> Result<Option<String>, StorageError> {
        self.folder_id(&self.root_folder, None, create).await
    }

    /// Upload `bytes` as `name` under `parent`, updating the existing file of
    /// that name if there is one.
    async fn upload_file(
        &self,
        name: &str,
        parent: &str,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> Result<String, StorageError> {
        let file_id = match self.find_file(name, Some(parent), false).await? {
            Some(id) => id,
            None => {
                let response = self
                    .client
                    .post(format!("{}/files", self.api_url))
                    .bearer_auth(self.bearer().await)
                    .query(&[("fields", "id")])
                    .json(&json!({ "name": name, "parents": [parent], "mimeType": mime_type }))
                    .send()
                    .await?;
                let file: DriveFile = check_status(response).await?.json().await?;
                file.id
            }
        };

        let response = self
            .client
            .patch(format!("{}/files/{}", self.upload_url, file_id))
            .bearer_auth(self.bearer().await)
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;
        check_status(response).await?;

        Ok(file_id)
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get(format!("{}/files/{}", self.api_url, file_id))
            .bearer_auth(self.bearer().await)
            .query(&[("alt", "media")])
            .send()
            .await?;
        Ok(check_status(response).await?.bytes().await?.to_vec())
    }
}

/// Drive search expression. Quotes and backslashes in names are escaped.
fn build_search_query(name: &str, parent: Option<&str>, folder: bool) -> String {
    let mut query = format!("name = '{}' and trashed = false", escape_query_value(name));
    if let Some(parent) = parent {
        query.push_str(&format!(" and '{}' in parents", escape_query_value(parent)));
    }
    let op = if folder { "=" } else { "!=" };
    query.push_str(&format!(" and mimeType {op} '{FOLDER_MIME_TYPE}'"));
    query
}

fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!("Drive request to {} failed with {}: {}", url, status, body);

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(StorageError::NotFound(url));
    }
    Err(StorageError::Remote(format!("Drive returned {status} for {url}")))
}

#[async_trait]
impl PhotoStorage for GoogleDriveStorage {
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
        let root = self.ensure_folder(&self.root_folder, None).await?;
        let session_folder = self.ensure_folder(session, Some(&root)).await?;

        let file_id = self
            .upload_file(&blob_file_name(photo_id), &session_folder, png, "image/png")
            .await?;

        tracing::debug!("Uploaded photo {} as Drive file {}", photo_id, file_id);
        Ok(StoredBlob {
            uri: format!("{SCHEME}://{file_id}"),
            file_id: Some(file_id),
        })
    }

    async fn load_blob(&self, uri: &str) -> Result<DynamicImage, StorageError> {
        let file_id = split_blob_uri(uri, SCHEME)?;
        let bytes = self.download(file_id).await?;
        decode_image(&bytes)
    }

    async fn remove_blob(&self, uri: &str) -> Result<(), StorageError> {
        let file_id = split_blob_uri(uri, SCHEME)?;
        let response = self
            .client
            .delete(format!("{}/files/{}", self.api_url, file_id))
            .bearer_auth(self.bearer().await)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn fetch_manifest(&self) -> Result<Option<ManifestIndex>, StorageError> {
        let Some(root) = self.root_folder_id(false).await? else {
            return Ok(None);
        };
        let Some(meta) = self.folder_id(META_FOLDER_NAME, Some(&root), false).await? else {
            return Ok(None);
        };
        let Some(file_id) = self.find_file(MANIFEST_FILE_NAME, Some(&meta), false).await? else {
            return Ok(None);
        };

        let bytes = self.download(&file_id).await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save_manifest(&self, index: &ManifestIndex) -> Result<(), StorageError> {
        let json = serde_json::to_vec(index)?;
        let root = self.ensure_folder(&self.root_folder, None).await?;
        let meta = self.ensure_folder(META_FOLDER_NAME, Some(&root)).await?;
        self.upload_file(MANIFEST_FILE_NAME, &meta, json, "application/json")
            .await?;
        Ok(())
    }

    async fn update_access_token(&self, access_token: &str) {
        *self.access_token.write().await = access_token.to_string();
    }
}
