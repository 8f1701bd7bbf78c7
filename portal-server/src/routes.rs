use crate::state::{Principal, ServerState};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use portal_core::dto::{ChatMessage, LiveReport, LoginRequest, LoginResponse, NewChatMessage};
use tracing::{info, warn};

pub fn portal_router(state: ServerState) -> Router {
    Router::new()
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .route("/chat/messages", get(list_messages).post(create_message))
        .route("/reports/live", get(live_report))
        .with_state(state)
}

async fn handle_login(
    State(state): State<ServerState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    match state.login(&request.email, &request.password).map_err(internal)? {
        Some((token, role)) => {
            info!(email = %request.email, role = role.as_str(), "login accepted");
            Ok(Json(LoginResponse {
                token: Some(token),
                role: Some(role.as_str().to_string()),
            }))
        }
        None => {
            warn!(email = %request.email, "login rejected");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

async fn handle_logout(State(state): State<ServerState>, headers: HeaderMap) -> StatusCode {
    let Some(token) = bearer(&headers) else {
        return StatusCode::UNAUTHORIZED;
    };
    match state.revoke(token) {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::UNAUTHORIZED,
        Err(err) => internal(err),
    }
}

async fn list_messages(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatMessage>>, StatusCode> {
    authorize(&state, &headers)?;
    state.messages().map(Json).map_err(internal)
}

async fn create_message(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(message): Json<NewChatMessage>,
) -> Result<(StatusCode, Json<ChatMessage>), StatusCode> {
    let principal = authorize(&state, &headers)?;
    let body = message.body.trim();
    if body.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let created = state
        .post_message(&principal.display_name, body)
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn live_report(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> Result<Json<LiveReport>, StatusCode> {
    authorize(&state, &headers)?;
    state.live_report().map(Json).map_err(internal)
}

fn authorize(state: &ServerState, headers: &HeaderMap) -> Result<Principal, StatusCode> {
    let token = bearer(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    state
        .authenticate(token)
        .map_err(internal)?
        .ok_or(StatusCode::UNAUTHORIZED)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn internal(err: String) -> StatusCode {
    warn!(error = %err, "state access failed");
    StatusCode::INTERNAL_SERVER_ERROR
}
