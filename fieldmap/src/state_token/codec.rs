use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::utils::{base64url_decode, base64url_encode, gen_random_bytes};

use super::config::StateTokenConfig;
use super::errors::StateTokenError;
use super::types::StatePayload;

type HmacSha256 = Hmac<Sha256>;

/// Domain separator mixed into every signature
const SIGNING_CONTEXT: &[u8] = b"fieldmap.oauth-state.v1";

const NONCE_LEN: usize = 16;

/// Issues and verifies `<payload>.<signature>` tokens, both parts base64url.
///
/// The signature covers the encoded payload text, so altering any character
/// of the token invalidates it.
#[derive(Debug, Clone)]
pub struct StateTokenCodec {
    config: StateTokenConfig,
}

impl StateTokenCodec {
    pub fn new(config: StateTokenConfig) -> Self {
        Self { config }
    }

    /// Configured max age in seconds
    pub fn max_age(&self) -> u64 {
        self.config.max_age
    }

    pub fn issue(&self) -> Result<String, StateTokenError> {
        self.issue_at(Utc::now().timestamp())
    }

    /// Verify a token against an explicit max age.
    pub fn verify(&self, token: &str, max_age: u64) -> Result<StatePayload, StateTokenError> {
        self.verify_at(token, max_age, Utc::now().timestamp())
    }

    /// Verify a token against the configured max age.
    pub fn verify_fresh(&self, token: &str) -> Result<StatePayload, StateTokenError> {
        self.verify(token, self.config.max_age)
    }

    pub(crate) fn issue_at(&self, issued_at: i64) -> Result<String, StateTokenError> {
        let nonce = base64url_encode(&gen_random_bytes(NONCE_LEN)?);
        let payload = StatePayload { nonce, issued_at };

        let payload_json =
            serde_json::to_vec(&payload).map_err(|e| StateTokenError::Serde(e.to_string()))?;
        let encoded_payload = base64url_encode(&payload_json);
        let signature = self.sign(&encoded_payload)?;

        Ok(format!("{encoded_payload}.{}", base64url_encode(&signature)))
    }

    pub(crate) fn verify_at(
        &self,
        token: &str,
        max_age: u64,
        now: i64,
    ) -> Result<StatePayload, StateTokenError> {
        let Some((encoded_payload, encoded_signature)) = token.split_once('.') else {
            tracing::warn!("State token rejected: malformed");
            return Err(StateTokenError::Tampered);
        };

        let signature = base64url_decode(encoded_signature).map_err(|_| {
            tracing::warn!("State token rejected: undecodable signature");
            StateTokenError::Tampered
        })?;

        let expected = self.sign(encoded_payload)?;
        if !bool::from(expected.as_slice().ct_eq(signature.as_slice())) {
            tracing::warn!("State token rejected: signature mismatch");
            return Err(StateTokenError::Tampered);
        }

        let payload_json = base64url_decode(encoded_payload).map_err(|_| {
            tracing::warn!("State token rejected: undecodable payload");
            StateTokenError::Tampered
        })?;
        let payload: StatePayload = serde_json::from_slice(&payload_json).map_err(|e| {
            tracing::warn!("State token rejected: invalid payload: {}", e);
            StateTokenError::Tampered
        })?;

        let age = now - payload.issued_at;
        if age < 0 || age as u64 > max_age {
            tracing::warn!(
                "State token rejected: expired (age {}s, max age {}s)",
                age,
                max_age
            );
            return Err(StateTokenError::Expired);
        }

        Ok(payload)
    }

    fn sign(&self, encoded_payload: &str) -> Result<Vec<u8>, StateTokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| StateTokenError::Crypto(e.to_string()))?;
        mac.update(SIGNING_CONTEXT);
        mac.update(b".");
        mac.update(encoded_payload.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
