//! Stateless, signed, time-limited tokens for the OAuth `state` parameter.
//!
//! A token carries a random nonce and its issue time, signed with HMAC-SHA256.
//! Nothing is stored server-side: a token is valid when its signature matches
//! and it is not older than the configured max age.

mod codec;
mod config;
mod errors;
mod types;

pub use codec::StateTokenCodec;
pub use config::{DEFAULT_STATE_MAX_AGE, StateTokenConfig};
pub use errors::StateTokenError;
pub use types::StatePayload;
