//! Artifact API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{require_text, success, ApiResponse, ApiResult};
use crate::errors::AppError;
use crate::events::HistoryEvent;
use crate::models::{Artifact, ArtifactFilter, CreateArtifactRequest, UpdateArtifactRequest};
use crate::AppState;

/// GET /api/artifacts - List live artifacts.
pub async fn list_artifacts(
    State(state): State<AppState>,
    Query(filter): Query<ArtifactFilter>,
) -> ApiResult<Vec<Artifact>> {
    success(state.repo.list_artifacts(&filter).await?)
}

/// GET /api/artifacts/:id - Get a single artifact with its current content.
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Artifact> {
    match state.repo.get_artifact(&id).await? {
        Some(artifact) => success(artifact),
        None => Err(AppError::artifact_not_found(&id)),
    }
}

/// POST /api/artifacts - Create an artifact, optionally with its first version.
pub async fn create_artifact(
    State(state): State<AppState>,
    Json(request): Json<CreateArtifactRequest>,
) -> ApiResult<Artifact> {
    require_text(&request.prompt, "prompt")?;
    require_text(&request.owner_id, "ownerId")?;
    if let Some(content) = &request.content {
        require_text(content, "content")?;
    }

    let (artifact, first_version) = state.repo.create_artifact(&request).await?;

    if let Some(version) = &first_version {
        state.events.publish(HistoryEvent::committed(version));
    }

    Ok(ApiResponse::created(artifact))
}

/// PUT /api/artifacts/:id - Update artifact metadata.
pub async fn update_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateArtifactRequest>,
) -> ApiResult<Artifact> {
    if let Some(title) = &request.title {
        require_text(title, "title")?;
    }
    if let Some(prompt) = &request.prompt {
        require_text(prompt, "prompt")?;
    }

    success(state.repo.update_artifact(&id, &request).await?)
}

/// DELETE /api/artifacts/:id - Tombstone an artifact.
pub async fn delete_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_artifact(&id).await?;
    state.events.publish(HistoryEvent::deleted(&id));
    success(())
}
