use std::time::Duration;

use crate::oauth2::errors::OAuth2Error;

/// HTTP client for provider calls.
///
/// - `timeout`: 30 seconds, so a stalled provider cannot hang a request.
/// - `pool_idle_timeout`: 90 seconds (reqwest default).
pub(crate) fn get_client() -> Result<reqwest::Client, OAuth2Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| OAuth2Error::HttpClient(e.to_string()))
}

/// First characters of a token, for log lines.
pub(super) fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}
