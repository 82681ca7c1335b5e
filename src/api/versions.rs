//! Version history API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_text, success, ApiResponse, ApiResult};
use crate::errors::AppError;
use crate::events::HistoryEvent;
use crate::history::{self, Revert, VersionRef};
use crate::models::{AppendVersionRequest, RevertRequest, Version, VersionHistory};
use crate::AppState;

/// GET /api/artifacts/:id/versions - Version list, newest first.
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<VersionHistory> {
    success(history::version_history(&state.repo, &id).await?)
}

/// GET /api/artifacts/:id/versions/:number - One version, for preview.
pub async fn get_version(
    State(state): State<AppState>,
    Path((id, number)): Path<(String, String)>,
) -> ApiResult<Version> {
    let number: i64 = number.parse().map_err(|_| {
        AppError::Validation(format!("Version number must be an integer, got {:?}", number))
    })?;

    if state.repo.get_artifact(&id).await?.is_none() {
        return Err(AppError::artifact_not_found(&id));
    }

    match state.repo.get_version(&id, number).await? {
        Some(version) => success(version),
        None => Err(AppError::NotFound(format!(
            "Version {} of artifact {} not found",
            number, id
        ))),
    }
}

/// POST /api/artifacts/:id/versions - Commit newly generated content.
pub async fn append_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AppendVersionRequest>,
) -> ApiResult<Version> {
    require_text(&request.content, "content")?;

    let version = state
        .repo
        .commit_version(&id, &request.content, request.instructions.as_deref())
        .await?;

    state.events.publish(HistoryEvent::committed(&version));
    Ok(ApiResponse::created(version))
}

/// POST /api/artifacts/:id/revert - Revert to a version by id or number.
pub async fn revert_version(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RevertRequest>,
) -> ApiResult<Version> {
    let target = VersionRef::try_from(&request)?;
    let revert = history::revert_to_version(&state.repo, &id, &target).await?;
    Ok(publish_revert(&state, revert))
}

/// POST /api/artifacts/:id/messages/:message_id/revert - Undo a chat edit.
pub async fn revert_to_message(
    State(state): State<AppState>,
    Path((id, message_id)): Path<(String, String)>,
) -> ApiResult<Version> {
    let revert = history::revert_to_message(&state.repo, &id, &message_id).await?;
    Ok(publish_revert(&state, revert))
}

fn publish_revert(state: &AppState, revert: Revert) -> ApiResponse<Version> {
    state
        .events
        .publish(HistoryEvent::reverted(&revert.version, revert.reverted_to));
    ApiResponse::created(revert.version)
}
