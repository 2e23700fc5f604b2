//! Remote manifest and image blob storage

mod blob_store;
mod errors;
mod imaging;
mod types;

pub use blob_store::{
    DriveConfig, GoogleDriveStorage, InMemoryPhotoStorage, LocalFolderStorage, PhotoStorage,
    StorageKind,
};
pub use errors::StorageError;
pub use imaging::{
    THUMBNAIL_SIZE, decode_image, encode_png, make_thumbnail, normalize_image, thumbnail_data_url,
};
pub use types::{
    MANIFEST_VERSION, ManifestIndex, PhotoMeta, StoredBlob, VARIANT_ANNOTATED, VARIANT_ORIGINAL,
};
