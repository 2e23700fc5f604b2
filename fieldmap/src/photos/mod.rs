//! Sessions of photos with annotated copies, synced to a remote manifest.

mod errors;
mod main;
mod types;

pub use errors::PhotoError;
pub use main::{AnnotationOutcome, PhotoStore};
pub use types::{
    DEFAULT_SESSION, ExportRow, Photo, PhotoContent, PhotoImages, PhotoVariant, TIMESTAMP_FORMAT,
};
