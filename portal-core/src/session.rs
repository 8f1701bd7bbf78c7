use crate::error::Result;
use crate::role::RoleClaim;
use crate::storage::SessionStorage;
use crate::token;
use std::sync::Arc;
use tracing::info;

pub const TOKEN_KEY: &str = "token";
pub const ROLE_KEY: &str = "role";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub role: RoleClaim,
}

impl Session {
    pub fn new(token: impl Into<String>, role: impl Into<RoleClaim>) -> Self {
        Self {
            token: token.into(),
            role: role.into(),
        }
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Injectable session context. The login/logout flow is the only writer,
/// apart from the 401 interceptor clearing a rejected session.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(storage: impl SessionStorage) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    pub fn from_shared(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Raw read of the persisted keys, without expiry revalidation.
    pub fn load(&self) -> Result<Option<Session>> {
        let Some(token) = self.storage.get(TOKEN_KEY)? else {
            return Ok(None);
        };
        if token.is_empty() {
            return Ok(None);
        }

        let role = match self.storage.get(ROLE_KEY)? {
            Some(raw) => RoleClaim::parse(&raw),
            None => token::decode_claims(&token)
                .and_then(|claims| claims.role)
                .map(|raw| RoleClaim::parse(&raw))
                .unwrap_or_else(|| RoleClaim::Unrecognized(String::new())),
        };

        Ok(Some(Session { token, role }))
    }

    /// Session usable for a protected route right now. An expired token
    /// clears the store and reads as no session.
    pub fn current(&self) -> Result<Option<Session>> {
        self.current_at(token::now_secs())
    }

    pub fn current_at(&self, now_secs: u64) -> Result<Option<Session>> {
        let Some(session) = self.load()? else {
            return Ok(None);
        };
        if token::is_expired_at(&session.token, now_secs) {
            info!(role = session.role.as_str(), "session token expired, clearing");
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        self.storage.set(TOKEN_KEY, &session.token)?;
        self.storage.set(ROLE_KEY, session.role.as_str())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(ROLE_KEY)?;
        Ok(())
    }
}
