use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A response without `token` means the credentials were rejected.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: String,
    pub body: String,
    pub sent_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub body: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveReport {
    pub total_donations: u64,
    pub total_amount: f64,
    pub active_volunteers: u64,
    pub pending_requests: u64,
    pub updated_at: String,
}
