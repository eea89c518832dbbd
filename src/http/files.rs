//! Workspace and file endpoints
//!
//! All client-supplied paths are relative to the workspace root and go
//! through `Workspace::resolve`, which rejects escapes. The workspace
//! root itself is switched with an explicit path; the selection is
//! persisted so a restart resumes in the same directory.

use super::{ApiResult, AppState};
use crate::error::NotescribeError;
use crate::workspace::FileNode;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct WorkspaceGetResponse {
    pub last_directory: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceSetRequest {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub path: String,
    #[serde(default)]
    pub content: String,
    /// `"file"` (default) or `"directory"`
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub old_path: String,
    pub new_path: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

/// GET /api/workspace/get
pub async fn workspace_get(State(state): State<AppState>) -> Json<WorkspaceGetResponse> {
    Json(WorkspaceGetResponse {
        last_directory: state.workspace.last_directory(),
    })
}

/// POST /api/workspace/set
pub async fn workspace_set(
    State(state): State<AppState>,
    Json(request): Json<WorkspaceSetRequest>,
) -> ApiResult<Json<StatusResponse>> {
    state.workspace.set_root(&request.path)?;
    Ok(ok())
}

/// GET /api/files/list
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<FileNode>>> {
    Ok(Json(state.workspace.list_tree()?))
}

/// GET /api/files/read?path=...
pub async fn read(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<ReadResponse>> {
    let resolved = state.workspace.resolve(&query.path)?;
    if !resolved.is_file() {
        return Err(NotescribeError::NotFound(query.path).into());
    }
    let content = tokio::fs::read_to_string(&resolved).await?;
    Ok(Json(ReadResponse {
        path: query.path,
        content,
    }))
}

/// POST /api/files/write
pub async fn write(
    State(state): State<AppState>,
    Json(request): Json<WriteRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let resolved = state.workspace.resolve(&request.path)?;
    if let Some(parent) = resolved.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&resolved, request.content).await?;
    tracing::debug!("Wrote {}", request.path);
    Ok(ok())
}

/// POST /api/files/create
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let resolved = state.workspace.resolve(&request.path)?;
    if resolved.exists() {
        return Err(
            NotescribeError::InvalidInput(format!("already exists: {}", request.path)).into(),
        );
    }

    if request.kind.as_deref() == Some("directory") {
        tokio::fs::create_dir_all(&resolved).await?;
    } else {
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&resolved, request.content).await?;
    }

    tracing::debug!("Created {}", request.path);
    Ok(Json(StatusResponse {
        status: "created".to_string(),
    }))
}

/// POST /api/files/rename
pub async fn rename(
    State(state): State<AppState>,
    Json(request): Json<RenameRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let old_resolved = state.workspace.resolve(&request.old_path)?;
    let new_resolved = state.workspace.resolve(&request.new_path)?;
    if !old_resolved.exists() {
        return Err(NotescribeError::NotFound(request.old_path).into());
    }
    if let Some(parent) = new_resolved.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(&old_resolved, &new_resolved).await?;
    tracing::debug!("Renamed {} -> {}", request.old_path, request.new_path);
    Ok(ok())
}

/// DELETE /api/files/delete?path=...
pub async fn delete(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<StatusResponse>> {
    let resolved = state.workspace.resolve(&query.path)?;
    if resolved.is_dir() {
        tokio::fs::remove_dir_all(&resolved).await?;
    } else if resolved.is_file() {
        tokio::fs::remove_file(&resolved).await?;
    } else {
        return Err(NotescribeError::NotFound(query.path).into());
    }
    tracing::debug!("Deleted {}", query.path);
    Ok(Json(StatusResponse {
        status: "deleted".to_string(),
    }))
}
