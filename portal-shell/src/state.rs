use portal_core::auth::AuthClient;
use portal_core::config::PortalConfig;
use portal_core::polling::PollingClient;

/// Services shared by the shell and the views it mounts.
#[derive(Clone)]
pub struct AppState {
    pub config: PortalConfig,
    pub auth: AuthClient,
    pub polling: PollingClient,
}
