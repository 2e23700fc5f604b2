use serde::Serialize;

use crate::oauth2::{CallbackParams, OAuth2Coordinator};
use crate::photos::PhotoStore;
use crate::storage::StorageKind;

use super::errors::CoordinationError;

/// Everything one user session owns: the sign-in flow with its tokens, and
/// the photo store.
pub struct AppContext {
    auth: OAuth2Coordinator,
    photos: PhotoStore,
    storage_kind: StorageKind,
}

/// Sign-in and storage summary
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub flow_state: &'static str,
    pub user_email: Option<String>,
    pub storage: &'static str,
    pub storage_attached: bool,
}

impl AppContext {
    pub fn new(auth: OAuth2Coordinator, photos: PhotoStore, storage_kind: StorageKind) -> Self {
        Self {
            auth,
            photos,
            storage_kind,
        }
    }

    /// Build from environment variables. Backends that need no sign-in are
    /// opened and loaded right away.
    pub async fn from_env() -> Result<Self, CoordinationError> {
        let auth = OAuth2Coordinator::from_env()?;
        let storage_kind = StorageKind::from_env()?;
        tracing::info!("Storage backend: {}", storage_kind.as_str());

        let mut photos = PhotoStore::new();
        if let Some(storage) = storage_kind.open(None)? {
            photos.attach_storage(storage);
            photos.load_from_remote().await;
        }

        Ok(Self::new(auth, photos, storage_kind))
    }

    pub fn auth(&self) -> &OAuth2Coordinator {
        &self.auth
    }

    pub fn auth_mut(&mut self) -> &mut OAuth2Coordinator {
        &mut self.auth
    }

    pub fn photos(&self) -> &PhotoStore {
        &self.photos
    }

    pub fn photos_mut(&mut self) -> &mut PhotoStore {
        &mut self.photos
    }

    pub fn storage_kind(&self) -> &StorageKind {
        &self.storage_kind
    }

    pub fn build_auth_url(&mut self) -> Result<String, CoordinationError> {
        Ok(self.auth.build_auth_url()?)
    }

    /// Complete sign-in, then attach Drive storage with the new token and
    /// load the remote manifest.
    pub async fn handle_callback(&mut self, params: &CallbackParams) -> Result<(), CoordinationError> {
        self.auth.handle_callback(params).await?;

        if self.storage_kind.requires_auth() {
            let access_token = self.auth.tokens_mut().access_token().await?;
            if let Some(storage) = self.storage_kind.open(Some(&access_token))? {
                self.photos.attach_storage(storage);
                self.photos.load_from_remote().await;
            }
        }
        Ok(())
    }

    /// Sign out. With Drive storage the user's photos go too, since they
    /// live in that user's Drive.
    pub fn sign_out(&mut self) {
        self.auth.sign_out();
        if self.storage_kind.requires_auth() {
            self.photos.detach_storage();
            self.photos.clear();
        }
    }

    /// Refresh the access token if needed and hand it to the storage
    /// backend. When the user is no longer authenticated, Drive storage is
    /// detached and `Unauthorized` returned.
    pub async fn refresh_storage_credentials(&mut self) -> Result<(), CoordinationError> {
        if !self.storage_kind.requires_auth() {
            return Ok(());
        }

        match self.auth.tokens_mut().access_token().await {
            Ok(access_token) => {
                if let Some(storage) = self.photos.storage() {
                    storage.update_access_token(&access_token).await;
                }
                Ok(())
            }
            Err(_) => {
                if self.photos.detach_storage().is_some() {
                    tracing::warn!("Access lost; Drive storage detached");
                }
                Err(CoordinationError::Unauthorized)
            }
        }
    }

    pub async fn status(&mut self) -> AuthStatus {
        let authenticated = self.auth.is_authenticated().await;
        let user_email = if authenticated {
            self.auth.tokens_mut().get_user_identity().await
        } else {
            None
        };

        AuthStatus {
            authenticated,
            flow_state: self.auth.state().as_str(),
            user_email,
            storage: self.storage_kind.as_str(),
            storage_attached: self.photos.has_storage(),
        }
    }
}
