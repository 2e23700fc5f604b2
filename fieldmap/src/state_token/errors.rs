use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateTokenError {
    /// Token is older than the allowed max age, or dated in the future
    #[error("State token expired")]
    Expired,

    /// Signature does not match, or the token is malformed
    #[error("State token signature mismatch")]
    Tampered,

    #[error("State signing secret missing: {0}")]
    SecretMissing(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serde error: {0}")]
    Serde(String),
}

impl From<UtilError> for StateTokenError {
    fn from(err: UtilError) -> Self {
        Self::Crypto(err.to_string())
    }
}
