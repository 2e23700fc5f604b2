use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fieldmap::AppContext;
use fieldmap_axum::{app_state, fieldmap_router};

mod server;

use crate::server::{DEFAULT_PORT, port_from_env, shutdown_signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,fieldmap=debug,tower_http=info", env!("CARGO_CRATE_NAME"))
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let context = AppContext::from_env().await.map_err(|e| e.log())?;
    let app = fieldmap_router(app_state(context));

    let port = port_from_env().unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
