//! Google OAuth authorization-code flow with stateless signed state.

mod config;
mod errors;
mod main;
mod types;

pub use config::{
    ClientCredentials, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GOOGLE_USERINFO_URL, OAuth2Config,
};
pub use errors::{OAuth2Error, SESSION_EXPIRED_MESSAGE};
pub use main::{GoogleOAuth2Provider, OAuth2Coordinator, OAuth2Provider, TokenStore};
pub use types::{AuthFlowState, CallbackParams, OAuthToken, TokenResponse};

#[cfg(test)]
pub(crate) use main::mock::MockProvider;
