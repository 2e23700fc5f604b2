use std::path::PathBuf;

use crate::config::env_non_empty;
use crate::storage::errors::StorageError;

use super::types::{GoogleDriveStorage, InMemoryPhotoStorage, LocalFolderStorage, PhotoStorage};

pub const DEFAULT_DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
pub const DEFAULT_DRIVE_ROOT_FOLDER: &str = "Fieldmap";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./data";

/// Storage backend selected by `FIELDMAP_STORAGE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    /// Google Drive, available once the user has signed in
    GoogleDrive(DriveConfig),
    /// Directory on the local filesystem
    LocalFolder(PathBuf),
    /// Process memory only
    Memory,
}

impl StorageKind {
    pub fn from_env() -> Result<Self, StorageError> {
        Self::parse(
            env_non_empty("FIELDMAP_STORAGE").as_deref(),
            env_non_empty("FIELDMAP_LOCAL_STORAGE_PATH"),
            DriveConfig::from_env(),
        )
    }

    fn parse(
        kind: Option<&str>,
        local_path: Option<String>,
        drive: DriveConfig,
    ) -> Result<Self, StorageError> {
        match kind.map(str::to_ascii_lowercase).as_deref() {
            None | Some("gdrive") => Ok(Self::GoogleDrive(drive)),
            Some("local") => Ok(Self::LocalFolder(PathBuf::from(
                local_path.unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_PATH.to_string()),
            ))),
            Some("memory") => Ok(Self::Memory),
            Some(other) => Err(StorageError::Config(format!(
                "Unsupported storage type: {other}. Supported types are 'gdrive', 'local' and 'memory'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleDrive(_) => "gdrive",
            Self::LocalFolder(_) => "local",
            Self::Memory => "memory",
        }
    }

    /// Whether the backend needs a signed-in user's access token
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::GoogleDrive(_))
    }

    /// Open the backend. Drive needs an access token; without one this
    /// returns `None`.
    pub fn open(
        &self,
        access_token: Option<&str>,
    ) -> Result<Option<Box<dyn PhotoStorage>>, StorageError> {
        let storage: Box<dyn PhotoStorage> = match self {
            Self::GoogleDrive(config) => match access_token {
                Some(token) => Box::new(GoogleDriveStorage::new(config, token)?),
                None => return Ok(None),
            },
            Self::LocalFolder(path) => Box::new(LocalFolderStorage::new(path.clone())),
            Self::Memory => Box::new(InMemoryPhotoStorage::new()),
        };
        Ok(Some(storage))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveConfig {
    pub api_url: String,
    pub upload_url: String,
    /// Top-level folder holding session folders and `_meta`
    pub root_folder: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_DRIVE_API_URL.to_string(),
            upload_url: DEFAULT_DRIVE_UPLOAD_URL.to_string(),
            root_folder: DEFAULT_DRIVE_ROOT_FOLDER.to_string(),
        }
    }
}

impl DriveConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: env_non_empty("DRIVE_API_URL").unwrap_or(defaults.api_url),
            upload_url: env_non_empty("DRIVE_UPLOAD_URL").unwrap_or(defaults.upload_url),
            root_folder: env_non_empty("DRIVE_ROOT_FOLDER").unwrap_or(defaults.root_folder),
        }
    }

    /// Send API and upload requests to one base URL, e.g. a test server.
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            api_url: format!("{base}/drive/v3"),
            upload_url: format!("{base}/upload/drive/v3"),
            root_folder: DEFAULT_DRIVE_ROOT_FOLDER.to_string(),
        }
    }
}
