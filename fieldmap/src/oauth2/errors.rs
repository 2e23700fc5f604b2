use thiserror::Error;

use crate::state_token::StateTokenError;
use crate::utils::UtilError;

/// Message shown to the user for any state problem. Expiry and tampering
/// are deliberately indistinguishable here.
pub const SESSION_EXPIRED_MESSAGE: &str = "Auth session expired. Please sign in again.";

#[derive(Debug, Error, Clone)]
pub enum OAuth2Error {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Authorization code missing from callback")]
    MissingCode,

    #[error("State parameter missing from callback")]
    MissingState,

    #[error("Invalid state: {0}")]
    InvalidState(StateTokenError),

    #[error("Provider reported an error: {0}")]
    ProviderDenied(String),

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Fetch user info error: {0}")]
    FetchUserInfo(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Serde error: {0}")]
    Serde(String),

    #[error("Url error: {0}")]
    Url(String),

    #[error("Http client error: {0}")]
    HttpClient(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl OAuth2Error {
    /// Text suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingState | Self::InvalidState(_) => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::MissingCode => "Sign-in was not completed. Please sign in again.".to_string(),
            Self::ProviderDenied(code) => format!("Sign-in failed: {code}"),
            Self::ConfigurationMissing(_) => "OAuth configuration missing".to_string(),
            Self::ExchangeFailed(_) => "Authentication failed. Please sign in again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StateTokenError> for OAuth2Error {
    fn from(err: StateTokenError) -> Self {
        match err {
            StateTokenError::SecretMissing(msg) => Self::ConfigurationMissing(msg),
            other => Self::InvalidState(other),
        }
    }
}
