//! Combined router for the sign-in flow and the photo API

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::state::AppState;

/// Uploaded images can be large phone captures
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Create the application router with HTTP tracing.
///
/// The endpoints are:
/// - `/` for the provider redirect and the status view
/// - `/auth/...` for sign-in, sign-out and status
/// - `/api/...` for sessions, photos and export
pub fn fieldmap_router(state: AppState) -> Router {
    fieldmap_router_no_trace(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(
                DefaultMakeSpan::new()
                    .level(Level::INFO)
                    .include_headers(true),
            )
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as `fieldmap_router()` without the tracing middleware, for callers
/// that install their own.
pub fn fieldmap_router_no_trace(state: AppState) -> Router {
    Router::new()
        .merge(super::auth::root_router())
        .nest("/auth", super::auth::router())
        .nest("/api", super::photos::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
