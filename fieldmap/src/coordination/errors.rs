//! Error types for application-level operations

use thiserror::Error;

use crate::oauth2::OAuth2Error;
use crate::photos::PhotoError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum CoordinationError {
    /// Operation needs a signed-in user
    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {resource_type} {resource_id}")]
    ResourceNotFound {
        resource_type: String,
        resource_id: String,
    },

    #[error("OAuth2 error: {0}")]
    OAuth2Error(OAuth2Error),

    #[error("Photo error: {0}")]
    PhotoError(PhotoError),

    #[error("Storage error: {0}")]
    StorageError(StorageError),
}

impl CoordinationError {
    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::Unauthorized => tracing::error!("Unauthorized access"),
            Self::Conflict(message) => tracing::error!("Conflict: {}", message),
            Self::BadRequest(message) => tracing::error!("Bad request: {}", message),
            Self::ResourceNotFound {
                resource_type,
                resource_id,
            } => tracing::error!("Resource not found: {} {}", resource_type, resource_id),
            Self::OAuth2Error(err) => tracing::error!("OAuth2 error: {}", err),
            Self::PhotoError(err) => tracing::error!("Photo error: {}", err),
            Self::StorageError(err) => tracing::error!("Storage error: {}", err),
        }
        self
    }

    pub fn photo_not_found(photo_id: u64) -> Self {
        Self::ResourceNotFound {
            resource_type: "photo".to_string(),
            resource_id: photo_id.to_string(),
        }
    }

    pub fn session_not_found(session: &str) -> Self {
        Self::ResourceNotFound {
            resource_type: "session".to_string(),
            resource_id: session.to_string(),
        }
    }

    /// Text suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            Self::OAuth2Error(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<OAuth2Error> for CoordinationError {
    fn from(err: OAuth2Error) -> Self {
        let error = match err {
            OAuth2Error::NotAuthenticated => Self::Unauthorized,
            other => Self::OAuth2Error(other),
        };
        tracing::error!("{}", error);
        error
    }
}

impl From<PhotoError> for CoordinationError {
    fn from(err: PhotoError) -> Self {
        let error = match err {
            PhotoError::SessionNotFound(session) => Self::session_not_found(&session),
            PhotoError::PhotoNotFound { photo_id, .. } => Self::photo_not_found(photo_id),
            other => Self::PhotoError(other),
        };
        tracing::error!("{}", error);
        error
    }
}

impl From<StorageError> for CoordinationError {
    fn from(err: StorageError) -> Self {
        let error = Self::StorageError(err);
        tracing::error!("{}", error);
        error
    }
}
