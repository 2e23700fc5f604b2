use std::sync::Arc;

use fieldmap::{AppContext, CoordinationError};
use tokio::sync::Mutex;

/// Shared handle to the single user context the server manages.
pub type AppState = Arc<Mutex<AppContext>>;

pub fn app_state(context: AppContext) -> AppState {
    Arc::new(Mutex::new(context))
}

/// Make sure the storage backend can be used by the current request.
///
/// For Drive this refreshes the access token when needed and fails with
/// `Unauthorized` when nobody is signed in.
pub(super) async fn ensure_storage(context: &mut AppContext) -> Result<(), CoordinationError> {
    if !context.storage_kind().requires_auth() {
        return Ok(());
    }
    context.refresh_storage_credentials().await?;
    if !context.photos().has_storage() {
        return Err(CoordinationError::Unauthorized.log());
    }
    Ok(())
}
