mod core;
mod google;
mod token_store;
mod utils;

pub use core::OAuth2Coordinator;
pub use google::{GoogleOAuth2Provider, OAuth2Provider};
pub use token_store::TokenStore;
