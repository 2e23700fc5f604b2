mod config;
mod gdrive;
mod local;
mod memory;
mod types;

pub use config::{DriveConfig, StorageKind};
pub use types::{GoogleDriveStorage, InMemoryPhotoStorage, LocalFolderStorage, PhotoStorage};
