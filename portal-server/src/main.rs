use portal_core::config::env_bool;
use portal_core::telemetry::init_tracing;
use portal_server::state::ServerState;

#[tokio::main]
async fn main() {
    init_tracing(env_bool(std::env::var("PORTAL_LOG_JSON").ok(), false));

    let addr = std::env::var("PORTAL_BIND").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let ttl = match portal_server::token_ttl(std::env::var("PORTAL_TOKEN_TTL_SECS").ok().as_deref()) {
        Ok(ttl) => ttl,
        Err(err) => {
            eprintln!("invalid server configuration: {err}");
            std::process::exit(2);
        }
    };

    let state = ServerState::with_demo_accounts(ttl);
    let (_, server) = match portal_server::spawn(&addr, state).await {
        Ok(bound) => bound,
        Err(err) => {
            eprintln!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    tokio::select! {
        _ = server => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
}
