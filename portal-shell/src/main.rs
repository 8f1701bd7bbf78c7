use portal_core::config::PortalConfig;
use portal_core::telemetry::init_tracing;

#[tokio::main]
async fn main() {
    let demo_mode = std::env::args().any(|arg| arg == "--demo");

    let config = match PortalConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid portal configuration: {err}");
            std::process::exit(2);
        }
    };
    init_tracing(config.log_json);

    let result = if demo_mode {
        portal_shell::run_demo(config).await
    } else {
        portal_shell::run(config).await
    };

    if let Err(err) = result {
        eprintln!("portal client stopped: {err}");
        std::process::exit(1);
    }
}
