use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use chrono::{Duration, Utc};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use fieldmap::{
    AppContext, ClientCredentials, DriveConfig, InMemoryPhotoStorage, OAuth2Config,
    OAuth2Coordinator, OAuth2Error, OAuth2Provider, OAuthToken, PhotoStore, StateTokenCodec,
    StateTokenConfig, StorageKind, TokenResponse,
};

use crate::router::fieldmap_router_no_trace;
use crate::state::{AppState, app_state};

/// Provider that accepts any code without network access
pub(crate) struct StubProvider;

#[async_trait]
impl OAuth2Provider for StubProvider {
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
    ) -> Result<OAuthToken, OAuth2Error> {
        Ok(OAuthToken {
            access_token: format!("stub-access-{code}"),
            refresh_token: Some("stub-refresh".to_string()),
            token_uri: "http://stub/token".to_string(),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            scopes: Vec::new(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        })
    }

    async fn refresh_token(&self, _token: &OAuthToken) -> Result<TokenResponse, OAuth2Error> {
        Err(OAuth2Error::RefreshFailed("stub".to_string()))
    }

    async fn fetch_user_email(&self, _access_token: &str) -> Result<Option<String>, OAuth2Error> {
        Ok(Some("stub@example.com".to_string()))
    }
}

fn coordinator() -> OAuth2Coordinator {
    OAuth2Coordinator::new(
        OAuth2Config::default()
            .with_client("axum-client", "axum-secret")
            .with_redirect_uri("https://fieldmap.test"),
        StateTokenCodec::new(StateTokenConfig::new("axum-test-secret", 300)),
        Arc::new(StubProvider),
    )
}

/// Router over in-memory storage; usable without signing in
pub(crate) fn memory_app() -> (Router, AppState) {
    let context = AppContext::new(
        coordinator(),
        PhotoStore::with_storage(Box::new(InMemoryPhotoStorage::new())),
        StorageKind::Memory,
    );
    let state = app_state(context);
    (fieldmap_router_no_trace(state.clone()), state)
}

/// Router over existing in-memory storage, with its manifest already loaded
pub(crate) async fn memory_app_with(storage: InMemoryPhotoStorage) -> (Router, AppState) {
    let mut photos = PhotoStore::with_storage(Box::new(storage));
    photos.load_from_remote().await;
    let context = AppContext::new(coordinator(), photos, StorageKind::Memory);
    let state = app_state(context);
    (fieldmap_router_no_trace(state.clone()), state)
}

/// Router over Drive storage pointed at a closed port, so remote calls fail
/// fast and the store keeps working locally.
pub(crate) fn drive_app() -> (Router, AppState) {
    let context = AppContext::new(
        coordinator(),
        PhotoStore::new(),
        StorageKind::GoogleDrive(DriveConfig::with_base_url("http://127.0.0.1:9")),
    );
    let state = app_state(context);
    (fieldmap_router_no_trace(state.clone()), state)
}

pub(crate) fn state_from_location(location: &str) -> Option<String> {
    url::Url::parse(location)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
}

pub(crate) fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 80, Rgb(color)));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode test image");
    bytes.into_inner()
}
