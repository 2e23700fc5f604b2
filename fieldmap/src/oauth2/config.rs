use std::fmt;

use crate::config::env_non_empty;

use super::errors::OAuth2Error;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const DEFAULT_SCOPE: &str = "openid email profile https://www.googleapis.com/auth/drive.file";

// Supported authorization parameters:
// access_type: offline (refresh token is issued)
// prompt: consent (refresh token is issued again on repeat sign-in)

/// OAuth client settings.
///
/// Credentials and the redirect URI are optional here; their absence is
/// reported as `ConfigurationMissing` when a flow actually needs them.
#[derive(Clone)]
pub struct OAuth2Config {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// The application's own base URL. The provider redirects here, not to a
    /// separate callback path.
    pub redirect_uri: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
}

impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            scopes: parse_scopes(DEFAULT_SCOPE),
        }
    }
}

impl OAuth2Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client_id: env_non_empty("GOOGLE_CLIENT_ID"),
            client_secret: env_non_empty("GOOGLE_CLIENT_SECRET"),
            redirect_uri: env_non_empty("APP_BASE_URL").map(|url| normalize_base_url(&url)),
            auth_url: env_non_empty("OAUTH2_AUTH_URL").unwrap_or(defaults.auth_url),
            token_url: env_non_empty("OAUTH2_TOKEN_URL").unwrap_or(defaults.token_url),
            userinfo_url: env_non_empty("OAUTH2_USERINFO_URL").unwrap_or(defaults.userinfo_url),
            scopes: env_non_empty("OAUTH2_SCOPE")
                .map(|s| parse_scopes(&s))
                .unwrap_or(defaults.scopes),
        }
    }

    pub fn with_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(normalize_base_url(&redirect_uri.into()));
        self
    }

    /// Point token and userinfo requests at another provider, e.g. a test server.
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self.userinfo_url = userinfo_url.into();
        self
    }

    /// Client credentials plus redirect URI, or `ConfigurationMissing` naming
    /// the first missing setting.
    pub fn client_credentials(&self) -> Result<ClientCredentials, OAuth2Error> {
        let client_id = self.client_id.clone().ok_or_else(|| {
            OAuth2Error::ConfigurationMissing("GOOGLE_CLIENT_ID is not configured".to_string())
        })?;
        let client_secret = self.client_secret.clone().ok_or_else(|| {
            OAuth2Error::ConfigurationMissing("GOOGLE_CLIENT_SECRET is not configured".to_string())
        })?;
        let redirect_uri = self.redirect_uri.clone().ok_or_else(|| {
            OAuth2Error::ConfigurationMissing("APP_BASE_URL is not configured".to_string())
        })?;

        Ok(ClientCredentials {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

fn parse_scopes(scope: &str) -> Vec<String> {
    scope
        .split(|c: char| c.is_whitespace() || c == '+' || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
