use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhotoError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Photo {photo_id} not found in session {session}")]
    PhotoNotFound { photo_id: u64, session: String },

    #[error("Image error: {0}")]
    Image(String),
}

impl From<StorageError> for PhotoError {
    fn from(err: StorageError) -> Self {
        Self::Image(err.to_string())
    }
}
