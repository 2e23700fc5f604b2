use std::sync::Arc;

use url::Url;

use crate::oauth2::config::OAuth2Config;
use crate::oauth2::errors::OAuth2Error;
use crate::oauth2::types::{AuthFlowState, CallbackParams};
use crate::state_token::{StateTokenCodec, StateTokenConfig};

use super::google::{GoogleOAuth2Provider, OAuth2Provider};
use super::token_store::TokenStore;
use super::utils::token_prefix;

/// Drives the authorization-code flow: `Idle -> AuthPending -> Authenticated`.
///
/// The state parameter is verified from its signature alone, so a callback
/// succeeds even when this coordinator was recreated after the redirect.
pub struct OAuth2Coordinator {
    config: OAuth2Config,
    codec: StateTokenCodec,
    tokens: TokenStore,
    flow: AuthFlowState,
}

impl OAuth2Coordinator {
    pub fn new(
        config: OAuth2Config,
        codec: StateTokenCodec,
        provider: Arc<dyn OAuth2Provider>,
    ) -> Self {
        Self {
            config,
            codec,
            tokens: TokenStore::new(provider),
            flow: AuthFlowState::Idle,
        }
    }

    pub fn from_env() -> Result<Self, OAuth2Error> {
        let config = OAuth2Config::from_env();
        let codec = StateTokenCodec::new(StateTokenConfig::from_env()?);
        let provider = Arc::new(GoogleOAuth2Provider::new(&config)?);
        Ok(Self::new(config, codec, provider))
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    pub fn state(&self) -> &AuthFlowState {
        &self.flow
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut TokenStore {
        &mut self.tokens
    }

    /// Authorization URL for the provider's consent page.
    ///
    /// While a flow is pending, the same URL is returned again as long as its
    /// state token still verifies, so a re-render does not invalidate the
    /// link the user may already be following.
    pub fn build_auth_url(&mut self) -> Result<String, OAuth2Error> {
        if let AuthFlowState::AuthPending {
            pending_url,
            state_token,
        } = &self.flow
        {
            if self.codec.verify_fresh(state_token).is_ok() {
                tracing::debug!("Reusing pending authorization URL");
                return Ok(pending_url.clone());
            }
            tracing::debug!("Pending authorization URL has expired; issuing a new one");
        }

        let credentials = self.config.client_credentials()?;
        let state_token = self.codec.issue()?;

        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("response_type", "code"),
                ("client_id", credentials.client_id.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("scope", self.config.scopes.join(" ").as_str()),
                ("state", state_token.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| OAuth2Error::Url(e.to_string()))?
        .to_string();

        tracing::info!(
            "Issued authorization URL with state {}...",
            token_prefix(&state_token)
        );

        self.flow = AuthFlowState::AuthPending {
            pending_url: url.clone(),
            state_token,
        };
        Ok(url)
    }

    /// Process the provider redirect.
    ///
    /// State and code problems return the flow to `Idle`. A failed code
    /// exchange leaves the flow where it was.
    pub async fn handle_callback(&mut self, params: &CallbackParams) -> Result<(), OAuth2Error> {
        if let Some(error) = &params.error {
            tracing::warn!("Provider reported an error on callback: {}", error);
            self.flow = AuthFlowState::Idle;
            return Err(OAuth2Error::ProviderDenied(error.clone()));
        }

        let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
            tracing::warn!("Callback without authorization code");
            self.flow = AuthFlowState::Idle;
            return Err(OAuth2Error::MissingCode);
        };

        let Some(state) = params.state.as_deref().filter(|s| !s.is_empty()) else {
            tracing::warn!("Callback without state parameter");
            self.flow = AuthFlowState::Idle;
            return Err(OAuth2Error::MissingState);
        };

        if let Err(e) = self.codec.verify_fresh(state) {
            tracing::warn!(
                "State {}... failed verification: {}",
                token_prefix(state),
                e
            );
            self.flow = AuthFlowState::Idle;
            return Err(OAuth2Error::InvalidState(e));
        }

        let credentials = self.config.client_credentials()?;

        let token = match self.tokens.provider().exchange_code(&credentials, code).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Authorization code exchange failed: {}", e);
                return Err(match e {
                    OAuth2Error::ExchangeFailed(_) => e,
                    other => OAuth2Error::ExchangeFailed(other.to_string()),
                });
            }
        };

        self.tokens.store(token);
        self.flow = AuthFlowState::Authenticated;
        tracing::info!("Sign-in completed");
        Ok(())
    }

    /// True when a usable token is held; a token that can no longer be
    /// refreshed drops the flow back to `Idle`.
    pub async fn is_authenticated(&mut self) -> bool {
        let authenticated = self.tokens.is_authenticated().await;
        if !authenticated && self.flow == AuthFlowState::Authenticated {
            self.flow = AuthFlowState::Idle;
        }
        authenticated
    }

    pub fn sign_out(&mut self) {
        self.tokens.clear();
        self.flow = AuthFlowState::Idle;
        tracing::info!("Signed out");
    }
}
