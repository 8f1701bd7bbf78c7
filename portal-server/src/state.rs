use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use portal_core::dto::{ChatMessage, LiveReport};
use portal_core::role::Role;
use portal_core::token;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

pub const DEMO_PASSWORD: &str = "relief";

#[derive(Clone, Debug)]
pub struct Account {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

struct Inner {
    accounts: Vec<Account>,
    tokens: HashMap<String, Principal>,
    messages: Vec<ChatMessage>,
    next_message_id: u64,
    next_token_id: u64,
    report: LiveReport,
}

/// In-memory backend state shared by every handler.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<Mutex<Inner>>,
    token_ttl: Duration,
}

impl ServerState {
    pub fn new(accounts: Vec<Account>, token_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                accounts,
                tokens: HashMap::new(),
                messages: Vec::new(),
                next_message_id: 1,
                next_token_id: 1,
                report: LiveReport::default(),
            })),
            token_ttl,
        }
    }

    /// One account per role, all sharing [`DEMO_PASSWORD`].
    pub fn with_demo_accounts(token_ttl: Duration) -> Self {
        let accounts = Role::ALL
            .into_iter()
            .map(|role| Account {
                email: format!("{role}@relief.test"),
                password: DEMO_PASSWORD.into(),
                display_name: format!("Demo {role}"),
                role,
            })
            .collect();
        let state = Self::new(accounts, token_ttl);
        if let Err(err) = state.seed_demo_data() {
            warn!(error = %err, "failed to seed demo data");
        }
        state
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, String> {
        self.inner.lock().map_err(|e| e.to_string())
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Option<(String, Role)>, String> {
        let mut inner = self.lock()?;
        let Some(account) = inner
            .accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email) && a.password == password)
            .cloned()
        else {
            return Ok(None);
        };

        inner.tokens.retain(|issued, _| !token::is_expired(issued));
        let jti = inner.next_token_id;
        inner.next_token_id += 1;
        let exp = now_secs() + self.token_ttl.as_secs();
        let token = issue_token(&account.email, account.role, exp, jti);
        inner.tokens.insert(
            token.clone(),
            Principal {
                email: account.email,
                display_name: account.display_name,
                role: account.role,
            },
        );
        Ok(Some((token, account.role)))
    }

    pub fn authenticate(&self, token: &str) -> Result<Option<Principal>, String> {
        let mut inner = self.lock()?;
        if token::is_expired(token) {
            inner.tokens.remove(token);
            return Ok(None);
        }
        Ok(inner.tokens.get(token).cloned())
    }

    pub fn revoke(&self, token: &str) -> Result<bool, String> {
        Ok(self.lock()?.tokens.remove(token).is_some())
    }

    pub fn messages(&self) -> Result<Vec<ChatMessage>, String> {
        Ok(self.lock()?.messages.clone())
    }

    pub fn post_message(&self, sender: &str, body: &str) -> Result<ChatMessage, String> {
        let mut inner = self.lock()?;
        let message = ChatMessage {
            id: inner.next_message_id,
            sender: sender.to_string(),
            body: body.to_string(),
            sent_at: now_secs().to_string(),
        };
        inner.next_message_id += 1;
        inner.messages.push(message.clone());
        Ok(message)
    }

    pub fn record_donation(&self, amount: f64) -> Result<(), String> {
        let mut inner = self.lock()?;
        inner.report.total_donations += 1;
        inner.report.total_amount += amount;
        inner.report.updated_at = now_secs().to_string();
        Ok(())
    }

    pub fn live_report(&self) -> Result<LiveReport, String> {
        let inner = self.lock()?;
        let mut report = inner.report.clone();
        report.active_volunteers = inner
            .tokens
            .values()
            .filter(|p| p.role == Role::Volunteer)
            .map(|p| p.email.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len() as u64;
        Ok(report)
    }

    pub fn set_pending_requests(&self, pending: u64) -> Result<(), String> {
        self.lock()?.report.pending_requests = pending;
        Ok(())
    }

    fn seed_demo_data(&self) -> Result<(), String> {
        self.post_message("Demo coordinator", "Welcome to the relief portal chat.")?;
        self.post_message("Demo volunteer", "Warehouse shift starts at 9.")?;
        self.record_donation(250.0)?;
        self.record_donation(40.0)?;
        self.set_pending_requests(3)
    }
}

/// Unsigned JWT-shaped token: the client decodes role and expiry locally.
pub fn issue_token(sub: &str, role: Role, exp: u64, jti: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = serde_json::json!({
        "sub": sub,
        "role": role.as_str(),
        "exp": exp,
        "jti": jti,
    });
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_issues_decodable_token() {
        let state = ServerState::with_demo_accounts(Duration::from_secs(60));
        let (token, role) = state
            .login("donor@relief.test", DEMO_PASSWORD)
            .expect("login")
            .expect("accepted");
        assert_eq!(role, Role::Donor);

        let claims = token::decode_claims(&token).expect("claims");
        assert_eq!(claims.role.as_deref(), Some("donor"));
        assert_eq!(claims.sub.as_deref(), Some("donor@relief.test"));

        let principal = state.authenticate(&token).expect("auth").expect("principal");
        assert_eq!(principal.role, Role::Donor);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let state = ServerState::with_demo_accounts(Duration::from_secs(60));
        assert!(state
            .login("donor@relief.test", "guess")
            .expect("login")
            .is_none());
    }

    #[test]
    fn expired_and_unknown_tokens_do_not_authenticate() {
        let state = ServerState::with_demo_accounts(Duration::from_secs(0));
        let (token, _) = state
            .login("admin@relief.test", DEMO_PASSWORD)
            .expect("login")
            .expect("accepted");
        assert!(state.authenticate(&token).expect("auth").is_none());
        assert!(state.authenticate("forged").expect("auth").is_none());
    }

    #[test]
    fn report_counts_distinct_volunteers() {
        let state = ServerState::with_demo_accounts(Duration::from_secs(60));
        state.login("volunteer@relief.test", DEMO_PASSWORD).expect("login");
        state.login("volunteer@relief.test", DEMO_PASSWORD).expect("login");
        state.login("donor@relief.test", DEMO_PASSWORD).expect("login");

        let report = state.live_report().expect("report");
        assert_eq!(report.active_volunteers, 1);
        assert_eq!(report.total_donations, 2);
        assert_eq!(report.pending_requests, 3);
    }

    #[test]
    fn messages_get_increasing_ids() {
        let state = ServerState::new(Vec::new(), Duration::from_secs(60));
        let a = state.post_message("ana", "one").expect("post");
        let b = state.post_message("ben", "two").expect("post");
        assert!(b.id > a.id);
        assert_eq!(state.messages().expect("messages").len(), 2);
    }

    #[test]
    fn login_prunes_expired_tokens() {
        let state = ServerState::with_demo_accounts(Duration::from_secs(0));
        for _ in 0..5 {
            state.login("donor@relief.test", DEMO_PASSWORD).expect("login");
        }
        assert_eq!(state.inner.lock().expect("lock").tokens.len(), 1);
    }

    #[test]
    fn seeding_reports_success() {
        let state = ServerState::new(Vec::new(), Duration::from_secs(60));
        state.seed_demo_data().expect("seed");
        assert_eq!(state.messages().expect("messages").len(), 2);
        assert_eq!(state.live_report().expect("report").total_donations, 2);
    }
}
