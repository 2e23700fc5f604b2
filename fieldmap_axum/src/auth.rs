use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use fieldmap::{AuthStatus, CallbackParams};

use super::error::IntoResponseError;
use super::state::AppState;

/// Routes mounted at the application root. The provider redirects back to
/// `/` itself, so the callback shares that route with the status view.
pub(super) fn root_router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/logout", post(logout))
        .route("/status", get(status))
}

async fn index(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, (StatusCode, String)> {
    let mut context = state.lock().await;

    if params.is_callback() {
        context
            .handle_callback(&params)
            .await
            .into_response_error()?;
        // Drop the code and state from the address bar
        return Ok(Redirect::to("/").into_response());
    }

    Ok(Json(context.status().await).into_response())
}

async fn login(State(state): State<AppState>) -> Result<Redirect, (StatusCode, String)> {
    let auth_url = state.lock().await.build_auth_url().into_response_error()?;
    Ok(Redirect::to(&auth_url))
}

async fn logout(State(state): State<AppState>) -> StatusCode {
    state.lock().await.sign_out();
    StatusCode::NO_CONTENT
}

async fn status(State(state): State<AppState>) -> Json<AuthStatus> {
    Json(state.lock().await.status().await)
}
