//! Central configuration for the fieldmap crate

use std::env;

/// Deployment mode read from `FIELDMAP_ENV`.
///
/// Anything other than `production` (case-insensitive) is treated as
/// development. Production mode forbids insecure fallbacks such as a
/// randomly generated state-signing secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Development,
    Production,
}

impl DeploymentMode {
    pub fn from_env() -> Self {
        match env::var("FIELDMAP_ENV") {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::Development,
        }
    }

    pub(crate) fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Reads an environment variable, treating empty strings as unset.
pub(crate) fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
