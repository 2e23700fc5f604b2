//! Images, configuration and coordinators shared by integration tests

use std::sync::{Arc, Once};

use fieldmap::{
    GoogleOAuth2Provider, OAuth2Config, OAuth2Coordinator, StateTokenCodec, StateTokenConfig,
};
use image::{DynamicImage, Rgb, RgbImage};

use super::mock_server::MockServer;

pub const TEST_CLIENT_ID: &str = "test-client-id";
pub const TEST_CLIENT_SECRET: &str = "test-client-secret";
pub const TEST_BASE_URL: &str = "https://fieldmap.test";
pub const TEST_STATE_SECRET: &str = "integration-state-secret";

/// Load `.env_test` once, falling back to `.env`.
pub fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }
    });
}

pub fn solid_image(color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 200, Rgb(color)))
}

/// White capture with a red box drawn on it, as the editor would return
pub fn annotated_image() -> DynamicImage {
    let mut image = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
    for i in 50..150 {
        for offset in 0..3 {
            image.put_pixel(i, 50 + offset, Rgb([255, 0, 0]));
            image.put_pixel(i, 147 + offset, Rgb([255, 0, 0]));
            image.put_pixel(50 + offset, i, Rgb([255, 0, 0]));
            image.put_pixel(147 + offset, i, Rgb([255, 0, 0]));
        }
    }
    DynamicImage::ImageRgb8(image)
}

pub fn oauth2_config(server: &MockServer) -> OAuth2Config {
    OAuth2Config::default()
        .with_client(TEST_CLIENT_ID, TEST_CLIENT_SECRET)
        .with_redirect_uri(TEST_BASE_URL)
        .with_endpoints(
            format!("{}/auth", server.base_url),
            format!("{}/token", server.base_url),
            format!("{}/userinfo", server.base_url),
        )
}

pub fn codec() -> StateTokenCodec {
    StateTokenCodec::new(StateTokenConfig::new(TEST_STATE_SECRET, 300))
}

/// Coordinator talking to the mock provider over HTTP
pub fn coordinator(server: &MockServer) -> OAuth2Coordinator {
    let config = oauth2_config(server);
    let provider = GoogleOAuth2Provider::new(&config).expect("provider");
    OAuth2Coordinator::new(config, codec(), Arc::new(provider))
}

pub fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
