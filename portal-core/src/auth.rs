use crate::dto::{LoginRequest, LoginResponse};
use crate::error::{PortalError, Result};
use crate::role::RoleClaim;
use crate::session::{Session, SessionStore};
use crate::token;
use crate::transport::{decode, Transport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const LOGIN_ENDPOINT: &str = "/login";

/// Login/logout flow plus bearer-authenticated calls. Any 401 from an
/// authenticated call clears the session before the error is returned.
#[derive(Clone)]
pub struct AuthClient {
    transport: Arc<dyn Transport>,
    sessions: SessionStore,
}

impl AuthClient {
    pub fn new(transport: Arc<dyn Transport>, sessions: SessionStore) -> Self {
        Self {
            transport,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let body = serde_json::to_value(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;

        let response: LoginResponse = match self.transport.post_json(LOGIN_ENDPOINT, None, body).await {
            Ok(serde_json::Value::Null) => LoginResponse::default(),
            Ok(value) => decode(value)?,
            Err(PortalError::Unauthorized) => LoginResponse::default(),
            Err(err) => return Err(err),
        };

        let Some(token) = response.token.filter(|t| !t.is_empty()) else {
            warn!(email, "login rejected");
            return Err(PortalError::InvalidCredentials);
        };

        let role = response
            .role
            .or_else(|| token::decode_claims(&token).and_then(|claims| claims.role))
            .map(|raw| RoleClaim::parse(&raw))
            .unwrap_or_else(|| RoleClaim::Unrecognized(String::new()));

        let session = Session { token, role };
        self.sessions.save(&session)?;
        info!(email, role = session.role.as_str(), "logged in");
        Ok(session)
    }

    pub fn logout(&self) -> Result<()> {
        self.sessions.clear()?;
        info!("logged out");
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let session = self.require_session()?;
        let result = self
            .transport
            .get_json(endpoint, Some(&session.token))
            .await;
        decode(self.intercept(result)?)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T> {
        let session = self.require_session()?;
        let body = serde_json::to_value(body)?;
        let result = self
            .transport
            .post_json(endpoint, Some(&session.token), body)
            .await;
        decode(self.intercept(result)?)
    }

    fn require_session(&self) -> Result<Session> {
        self.sessions.current()?.ok_or(PortalError::NotAuthenticated)
    }

    fn intercept(&self, result: Result<serde_json::Value>) -> Result<serde_json::Value> {
        if let Err(PortalError::Unauthorized) = &result {
            warn!("backend rejected token, clearing session");
            self.sessions.clear()?;
        }
        result
    }
}
