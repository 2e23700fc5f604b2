use async_trait::async_trait;
use chrono::Utc;

use crate::oauth2::config::{ClientCredentials, OAuth2Config};
use crate::oauth2::errors::OAuth2Error;
use crate::oauth2::types::{GoogleUserInfo, OAuthToken, TokenResponse};

use super::utils::get_client;

/// Calls to the identity provider's token and userinfo endpoints.
#[async_trait]
pub trait OAuth2Provider: Send + Sync {
    /// Exchange an authorization code for tokens.
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
    ) -> Result<OAuthToken, OAuth2Error>;

    /// Exchange the refresh token for a new access token. Returns the token
    /// endpoint response so the caller can update its token in place.
    async fn refresh_token(&self, token: &OAuthToken) -> Result<TokenResponse, OAuth2Error>;

    /// Email of the signed-in user, if the provider reports one.
    async fn fetch_user_email(&self, access_token: &str) -> Result<Option<String>, OAuth2Error>;
}

#[derive(Debug, Clone)]
pub struct GoogleOAuth2Provider {
    client: reqwest::Client,
    token_url: String,
    userinfo_url: String,
    scopes: Vec<String>,
}

impl GoogleOAuth2Provider {
    pub fn new(config: &OAuth2Config) -> Result<Self, OAuth2Error> {
        Ok(Self {
            client: get_client()?,
            token_url: config.token_url.clone(),
            userinfo_url: config.userinfo_url.clone(),
            scopes: config.scopes.clone(),
        })
    }

    async fn post_token_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, String> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| e.to_string())?;

        if status != reqwest::StatusCode::OK {
            tracing::debug!("Token endpoint error body: {}", response_body);
            return Err(format!("token endpoint returned {status}"));
        }

        serde_json::from_str(&response_body)
            .map_err(|e| format!("Failed to deserialize token response: {e}"))
    }
}

#[async_trait]
impl OAuth2Provider for GoogleOAuth2Provider {
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
    ) -> Result<OAuthToken, OAuth2Error> {
        let response = self
            .post_token_form(
                &self.token_url,
                &[
                    ("code", code),
                    ("client_id", &credentials.client_id),
                    ("client_secret", &credentials.client_secret),
                    ("redirect_uri", &credentials.redirect_uri),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await
            .map_err(OAuth2Error::ExchangeFailed)?;

        tracing::debug!(
            "Token exchange succeeded, refresh token issued: {}",
            response.refresh_token.is_some()
        );

        Ok(OAuthToken::from_response(
            response,
            credentials,
            &self.token_url,
            &self.scopes,
            Utc::now(),
        ))
    }

    async fn refresh_token(&self, token: &OAuthToken) -> Result<TokenResponse, OAuth2Error> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| OAuth2Error::RefreshFailed("no refresh token held".to_string()))?;

        self.post_token_form(
            &token.token_uri,
            &[
                ("refresh_token", refresh_token),
                ("client_id", &token.client_id),
                ("client_secret", &token.client_secret),
                ("grant_type", "refresh_token"),
            ],
        )
        .await
        .map_err(OAuth2Error::RefreshFailed)
    }

    async fn fetch_user_email(&self, access_token: &str) -> Result<Option<String>, OAuth2Error> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuth2Error::FetchUserInfo(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuth2Error::FetchUserInfo(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        let response_body = response
            .text()
            .await
            .map_err(|e| OAuth2Error::FetchUserInfo(e.to_string()))?;

        let user_info: GoogleUserInfo = serde_json::from_str(&response_body)
            .map_err(|e| OAuth2Error::Serde(format!("Failed to deserialize response body: {e}")))?;

        tracing::debug!(
            "User info fetched: id={:?}, name={:?}",
            user_info.id,
            user_info.name
        );
        Ok(user_info.email)
    }
}
