//! Session and chat endpoints
//!
//! The chat flow is: append the user turn to the session (creating it
//! if absent), hand the full history to the gateway, persist exactly
//! what the gateway returns. Any gateway failure drops the session so
//! the next request starts from a clean slate instead of replaying a
//! possibly-inconsistent history.

use super::{ApiResult, AppState};
use crate::error::NotescribeError;
use crate::session::Turn;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// POST /create-session
pub async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session_id = state.sessions.create();
    tracing::debug!("Created session {}", session_id);
    Json(CreateSessionResponse { session_id })
}

/// POST /ask-ai
///
/// A missing or unknown session id starts a fresh session; when the
/// client also supplied a conversation history (session loss recovery),
/// that history seeds the new session before the question is appended.
pub async fn ask_ai(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> ApiResult<Json<AskResponse>> {
    if request.question.trim().is_empty() {
        return Err(NotescribeError::InvalidInput("question is empty".to_string()).into());
    }

    let session_id = request
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| state.sessions.create());

    if !state.sessions.contains(&session_id) && !request.conversation_history.is_empty() {
        state
            .sessions
            .replace_history(&session_id, request.conversation_history);
    }

    let history = state
        .sessions
        .append_and_get_history(&session_id, Turn::user(&request.question));

    match state.gateway.generate_reply(&history).await {
        Ok((reply, updated)) => {
            state.sessions.replace_history(&session_id, updated);
            Ok(Json(AskResponse {
                response: reply,
                session_id,
            }))
        }
        Err(e) => {
            // Fail fast: never retain possibly-inconsistent history
            tracing::warn!("Dropping session {} after gateway failure", session_id);
            state.sessions.delete(&session_id);
            Err(e.into())
        }
    }
}

/// POST /generate-title
///
/// Never fails the caller: every failure path inside the gateway
/// resolves to the fixed fallback title.
pub async fn generate_title(
    State(state): State<AppState>,
    Json(request): Json<TitleRequest>,
) -> Json<TitleResponse> {
    let history = request
        .session_id
        .as_deref()
        .and_then(|id| state.sessions.history(id))
        .unwrap_or(request.conversation_history);

    let title = state.gateway.generate_title(&history).await;
    Json(TitleResponse { title })
}

/// DELETE /clear-session/{session_id}
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<StatusResponse> {
    state.sessions.delete(&session_id);
    Json(StatusResponse {
        status: "cleared".to_string(),
    })
}
