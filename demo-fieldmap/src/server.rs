pub(crate) const DEFAULT_PORT: u16 = 3001;

/// `PORT`, if set to a valid port number
pub(crate) fn port_from_env() -> Option<u16> {
    let value = std::env::var("PORT").ok()?;
    match value.trim().parse() {
        Ok(port) => Some(port),
        Err(_) => {
            tracing::warn!("Ignoring invalid PORT {:?}", value);
            None
        }
    }
}

pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down");
}
