use serde::{Deserialize, Serialize};

/// Signed content of an OAuth `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload {
    /// 128-bit random value, base64url encoded
    pub nonce: String,
    /// Unix timestamp in seconds
    pub issued_at: i64,
}
