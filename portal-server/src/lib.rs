//! Development REST backend for the Relief Portal client: login, chat and
//! live-report endpoints behind bearer tokens, all held in memory.

pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Parse `PORTAL_TOKEN_TTL_SECS`. Unset means [`DEFAULT_TOKEN_TTL`].
pub fn token_ttl(value: Option<&str>) -> Result<Duration, String> {
    match value {
        None => Ok(DEFAULT_TOKEN_TTL),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("PORTAL_TOKEN_TTL_SECS: {e}")),
    }
}

/// Bind `addr` and serve the portal routes until the task is dropped.
/// Returns the bound address, so `127.0.0.1:0` can be used in tests.
pub async fn spawn(
    addr: &str,
    state: state::ServerState,
) -> std::io::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let app = routes::portal_router(state);
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "portal server stopped");
        }
    });
    tracing::info!(addr = %local, "portal server listening");
    Ok((local, handle))
}
