use crate::error::{PortalError, Result};
use crate::polling::DEFAULT_POLL_INTERVAL;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_SESSION_DB: &str = "portal-session.db";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortalConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// `None` keeps the session in memory only.
    pub session_db: Option<String>,
    pub credentials: Option<Credentials>,
    /// Path to open once the role's landing route is shown.
    pub initial_view: Option<String>,
    pub log_json: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_millis(5000),
            session_db: Some(DEFAULT_SESSION_DB.into()),
            credentials: None,
            initial_view: None,
            log_json: false,
        }
    }
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let poll_ms = parse_u64(&lookup, "PORTAL_POLL_INTERVAL_MS")?
            .unwrap_or(defaults.poll_interval.as_millis() as u64);
        if poll_ms == 0 {
            return Err(PortalError::Config(
                "PORTAL_POLL_INTERVAL_MS must be greater than zero".into(),
            ));
        }
        let timeout_ms = parse_u64(&lookup, "PORTAL_REQUEST_TIMEOUT_MS")?
            .unwrap_or(defaults.request_timeout.as_millis() as u64);

        let session_db = match lookup("PORTAL_SESSION_DB") {
            Some(v) if v.trim().is_empty() || v == ":memory:" => None,
            Some(v) => Some(v),
            None => defaults.session_db,
        };

        let credentials = match (lookup("PORTAL_EMAIL"), lookup("PORTAL_PASSWORD")) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            (None, None) => None,
            _ => {
                return Err(PortalError::Config(
                    "PORTAL_EMAIL and PORTAL_PASSWORD must be set together".into(),
                ))
            }
        };

        Ok(Self {
            api_url: lookup("PORTAL_API_URL").unwrap_or(defaults.api_url),
            poll_interval: Duration::from_millis(poll_ms),
            request_timeout: Duration::from_millis(timeout_ms),
            session_db,
            credentials,
            initial_view: lookup("PORTAL_VIEW").filter(|v| !v.trim().is_empty()),
            log_json: env_bool(lookup("PORTAL_LOG_JSON"), defaults.log_json),
        })
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    lookup(name)
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map_err(|e| PortalError::Config(format!("{name}: {e}")))
        })
        .transpose()
}

pub fn env_bool(value: Option<String>, default: bool) -> bool {
    value
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
