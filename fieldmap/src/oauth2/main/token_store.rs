use std::sync::Arc;

use chrono::Utc;

use crate::oauth2::errors::OAuth2Error;
use crate::oauth2::types::OAuthToken;

use super::google::OAuth2Provider;

/// Holds the current user's token and refreshes it on expiry.
pub struct TokenStore {
    token: Option<OAuthToken>,
    provider: Arc<dyn OAuth2Provider>,
}

impl TokenStore {
    pub fn new(provider: Arc<dyn OAuth2Provider>) -> Self {
        Self {
            token: None,
            provider,
        }
    }

    pub fn token(&self) -> Option<&OAuthToken> {
        self.token.as_ref()
    }

    pub(super) fn provider(&self) -> &Arc<dyn OAuth2Provider> {
        &self.provider
    }

    pub(crate) fn store(&mut self, token: OAuthToken) {
        self.token = Some(token);
    }

    pub(crate) fn clear(&mut self) {
        self.token = None;
    }

    /// True when a usable token is held. An expired token is refreshed first
    /// when a refresh token is available.
    pub async fn is_authenticated(&mut self) -> bool {
        let Some(token) = &self.token else {
            return false;
        };

        if !token.is_expired() {
            return true;
        }

        if token.refresh_token.is_none() {
            tracing::debug!("Access token expired and no refresh token is held");
            return false;
        }

        self.refresh().await
    }

    /// Replace the access token using the refresh token. Failures are logged
    /// and reported as `false`.
    pub async fn refresh(&mut self) -> bool {
        let Some(token) = &self.token else {
            return false;
        };

        match self.provider.refresh_token(token).await {
            Ok(response) => {
                if let Some(token) = self.token.as_mut() {
                    token.apply_refresh(response, Utc::now());
                }
                tracing::info!("Access token refreshed");
                true
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                false
            }
        }
    }

    /// Current access token, refreshed if needed.
    pub async fn access_token(&mut self) -> Result<String, OAuth2Error> {
        if !self.is_authenticated().await {
            return Err(OAuth2Error::NotAuthenticated);
        }
        self.token
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or(OAuth2Error::NotAuthenticated)
    }

    /// Email of the signed-in user. Best effort: `None` on any failure.
    pub async fn get_user_identity(&mut self) -> Option<String> {
        let access_token = self.access_token().await.ok()?;
        match self.provider.fetch_user_email(&access_token).await {
            Ok(email) => email,
            Err(e) => {
                tracing::debug!("Failed to fetch user identity: {}", e);
                None
            }
        }
    }
}
