use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::ClientCredentials;

/// Tokens held for the signed-in user.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl OAuthToken {
    pub(crate) fn from_response(
        response: TokenResponse,
        credentials: &ClientCredentials,
        token_uri: &str,
        requested_scopes: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let scopes = response
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| requested_scopes.to_vec());

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_uri: token_uri.to_string(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            scopes,
            expires_at: response.expires_in.map(|s| now + Duration::seconds(s as i64)),
        }
    }

    /// A token without an expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Apply a refresh response in place. The refresh token is kept when the
    /// provider does not rotate it.
    pub(crate) fn apply_refresh(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.access_token = response.access_token;
        self.expires_at = response.expires_in.map(|s| now + Duration::seconds(s as i64));
        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

/// Token endpoint response body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Query parameters on the provider's redirect back to the base URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    /// True when the request looks like a provider redirect at all
    pub fn is_callback(&self) -> bool {
        self.code.is_some() || self.state.is_some() || self.error.is_some()
    }
}

/// Sign-in flow state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFlowState {
    Idle,
    /// An authorization URL was handed out and the user has not come back yet
    AuthPending {
        pending_url: String,
        state_token: String,
    },
    Authenticated,
}

impl AuthFlowState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::AuthPending { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AuthPending { .. } => "auth_pending",
            Self::Authenticated => "authenticated",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct GoogleUserInfo {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) name: Option<String>,
}
