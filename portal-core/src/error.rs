use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The backend answered 401; the session has been (or must be) cleared.
    #[error("unauthorized")]
    Unauthorized,

    #[error("no active session")]
    NotAuthenticated,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

impl From<rusqlite::Error> for PortalError {
    fn from(err: rusqlite::Error) -> Self {
        PortalError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status == reqwest::StatusCode::UNAUTHORIZED => PortalError::Unauthorized,
            Some(status) => PortalError::Status(status.as_u16()),
            None if err.is_decode() => PortalError::Decode(err.to_string()),
            None => PortalError::Transport(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
