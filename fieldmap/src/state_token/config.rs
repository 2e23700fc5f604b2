use std::fmt;

use crate::config::{DeploymentMode, env_non_empty};
use crate::utils::gen_random_string;

use super::errors::StateTokenError;

/// Default max age of a state token in seconds
pub const DEFAULT_STATE_MAX_AGE: u64 = 300;

#[derive(Clone)]
pub struct StateTokenConfig {
    pub(super) secret: Vec<u8>,
    pub(super) max_age: u64,
}

impl fmt::Debug for StateTokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTokenConfig")
            .field("secret", &"<redacted>")
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl StateTokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>, max_age: u64) -> Self {
        Self {
            secret: secret.into(),
            max_age,
        }
    }

    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    /// Resolve the signing secret from `OAUTH_STATE_SECRET`, and the max age
    /// from `OAUTH_STATE_MAX_AGE`, in the deployment mode read from `FIELDMAP_ENV`.
    pub fn from_env() -> Result<Self, StateTokenError> {
        Self::resolve(None, DeploymentMode::from_env())
    }

    /// Resolve the signing secret in order: explicit value, `OAUTH_STATE_SECRET`,
    /// then a random development-only secret.
    ///
    /// The random fallback is refused in production mode: tokens signed with it
    /// cannot be verified after a restart.
    pub fn resolve(
        explicit_secret: Option<&str>,
        mode: DeploymentMode,
    ) -> Result<Self, StateTokenError> {
        let max_age = state_max_age_from_env();

        if let Some(secret) = explicit_secret.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(Self::new(secret.as_bytes().to_vec(), max_age));
        }

        if let Some(secret) = env_non_empty("OAUTH_STATE_SECRET") {
            return Ok(Self::new(secret.into_bytes(), max_age));
        }

        if mode.is_production() {
            tracing::error!("OAUTH_STATE_SECRET is not set in production mode");
            return Err(StateTokenError::SecretMissing(
                "OAUTH_STATE_SECRET must be set when FIELDMAP_ENV=production".to_string(),
            ));
        }

        tracing::warn!(
            "OAUTH_STATE_SECRET is not set; generated a random development secret. \
             State tokens will not survive a restart."
        );
        let secret = gen_random_string(32)?;
        Ok(Self::new(secret.into_bytes(), max_age))
    }
}

fn state_max_age_from_env() -> u64 {
    parse_max_age(env_non_empty("OAUTH_STATE_MAX_AGE").as_deref())
}

fn parse_max_age(value: Option<&str>) -> u64 {
    value
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_STATE_MAX_AGE)
}
