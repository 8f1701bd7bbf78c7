pub mod runtime;
pub mod state;

use crate::runtime::{Shell, StdoutSink};
use crate::state::AppState;
use portal_core::auth::AuthClient;
use portal_core::config::PortalConfig;
use portal_core::dto::{ChatMessage, NewChatMessage};
use portal_core::navigation::LiveFeed;
use portal_core::polling::PollingClient;
use portal_core::router::Route;
use portal_core::session::SessionStore;
use portal_core::storage::{MemoryStorage, SqliteStorage};
use portal_core::transport::{HttpTransport, Transport};
use portal_core::{PortalError, Result};
use portal_server::state::{ServerState, DEMO_PASSWORD};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub fn build_state(config: &PortalConfig) -> Result<AppState> {
    let sessions = match &config.session_db {
        Some(path) => SessionStore::new(SqliteStorage::open(path)?),
        None => SessionStore::new(MemoryStorage::new()),
    };
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&config.api_url, config.request_timeout)?);

    Ok(AppState {
        config: config.clone(),
        auth: AuthClient::new(Arc::clone(&transport), sessions.clone()),
        polling: PollingClient::new(transport, sessions, config.poll_interval),
    })
}

pub async fn run(config: PortalConfig) -> Result<()> {
    let state = build_state(&config)?;
    let mut shell = Shell::new(state, StdoutSink);

    let resumed = shell.start()?;
    if !matches!(resumed, Route::Dashboard { .. }) {
        if let Some(credentials) = &config.credentials {
            shell.login(&credentials.email, &credentials.password).await?;
        } else {
            warn!("no stored session and no credentials; staying on {:?}", resumed);
        }
    }
    if let Some(path) = &config.initial_view {
        shell.open(path)?;
    }

    let mut check = tokio::time::interval(config.poll_interval);
    loop {
        tokio::select! {
            _ = check.tick() => shell.sync_session()?,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

/// Walk a donor through the portal against an in-process backend.
pub async fn run_demo(config: PortalConfig) -> Result<()> {
    let backend = ServerState::with_demo_accounts(Duration::from_secs(3600));
    let (addr, server) = portal_server::spawn("127.0.0.1:0", backend)
        .await
        .map_err(|e| PortalError::Transport(e.to_string()))?;

    let config = PortalConfig {
        api_url: format!("http://{addr}"),
        session_db: None,
        ..config
    };
    let state = build_state(&config)?;
    let mut shell = Shell::new(state.clone(), StdoutSink);
    shell.start()?;

    shell.login("donor@relief.test", DEMO_PASSWORD).await?;
    shell.open("donor/chat")?;
    info!(feed = ?shell.mounted_feed(), "chat view mounted");
    tokio::time::sleep(config.poll_interval).await;

    let posted: ChatMessage = state
        .auth
        .post(
            LiveFeed::Chat.endpoint(),
            &NewChatMessage {
                body: "Dropping off blankets at noon.".into(),
            },
        )
        .await?;
    info!(id = posted.id, "posted chat message");
    tokio::time::sleep(config.poll_interval * 2).await;

    shell.open("admin/users")?;
    shell.logout()?;
    shell.open("donor/profile")?;

    server.abort();
    Ok(())
}
