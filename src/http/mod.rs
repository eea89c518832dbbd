//! HTTP surface of the Notescribe backend
//!
//! Router construction, shared application state, and the error-to-status
//! mapping. Handlers live in the sibling modules: `chat` for the session
//! and title endpoints, `files` for workspace file operations, `media`
//! for image/PDF/YouTube/scrape endpoints.

pub mod chat;
pub mod files;
pub mod media;

use crate::error::NotescribeError;
use crate::gateway::Gateway;
use crate::session::SessionStore;
use crate::workspace::Workspace;

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    /// Domain facade over the generation provider
    pub gateway: Gateway,
    /// Conversation session store
    pub sessions: SessionStore,
    /// Workspace root and file helpers
    pub workspace: Arc<Workspace>,
}

/// Error wrapper translating crate errors into HTTP responses
///
/// Handlers return `ApiResult<T>` and use `?` freely; the mapping onto
/// coarse status classes happens here in one place.
pub struct ApiError(anyhow::Error);

/// Result alias for handler functions
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!("request failed ({}): {}", status, self.0);
        } else {
            tracing::debug!("request rejected ({}): {}", status, self.0);
        }
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Map an error onto its status class per the service's error taxonomy
fn status_for(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<NotescribeError>() {
        Some(NotescribeError::InvalidInput(_))
        | Some(NotescribeError::PathOutsideWorkspace(_))
        | Some(NotescribeError::Workspace(_))
        | Some(NotescribeError::Serialization(_)) => StatusCode::BAD_REQUEST,
        Some(NotescribeError::NotFound(_)) => StatusCode::NOT_FOUND,
        Some(NotescribeError::MissingCredentials(_)) | Some(NotescribeError::Config(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        Some(NotescribeError::Provider(_)) | Some(NotescribeError::Http(_)) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/create-session", post(chat::create_session))
        .route("/ask-ai", post(chat::ask_ai))
        .route("/generate-title", post(chat::generate_title))
        .route("/clear-session/:session_id", delete(chat::clear_session))
        .route("/api/workspace/get", get(files::workspace_get))
        .route("/api/workspace/set", post(files::workspace_set))
        .route("/api/files/list", get(files::list))
        .route("/api/files/read", get(files::read))
        .route("/api/files/write", post(files::write))
        .route("/api/files/create", post(files::create))
        .route("/api/files/rename", post(files::rename))
        .route("/api/files/delete", delete(files::delete))
        .route("/api/image/upload", post(media::image_upload))
        .route("/api/image/process", post(media::image_process))
        .route("/api/pdf/extract-text", post(media::pdf_extract_text))
        .route("/api/pdf/ask", post(media::pdf_ask))
        .route("/api/youtube/analyze", post(media::youtube_analyze))
        .route("/api/youtube/extract-code", post(media::youtube_extract_code))
        .route("/api/scrape", post(media::scrape))
        .fallback(handler_404)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handler_404(path: Uri) -> impl IntoResponse {
    info!("404 {}", path);
    (StatusCode::NOT_FOUND, format!("no handler for {}", path))
}

/// Bind and serve until the shutdown future resolves
pub async fn serve(
    host: &str,
    port: u16,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> crate::error::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("clean shutdown");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_invalid_input() {
        let err: anyhow::Error = NotescribeError::InvalidInput("bad".to_string()).into();
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_for_path_escape() {
        let err: anyhow::Error = NotescribeError::PathOutsideWorkspace("..".to_string()).into();
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_for_not_found() {
        let err: anyhow::Error = NotescribeError::NotFound("x".to_string()).into();
        assert_eq!(status_for(&err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_for_missing_credentials() {
        let err: anyhow::Error = NotescribeError::MissingCredentials("gemini".to_string()).into();
        assert_eq!(status_for(&err), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_status_for_provider_failure() {
        let err: anyhow::Error = NotescribeError::Provider("down".to_string()).into();
        assert_eq!(status_for(&err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_status_for_unclassified() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
