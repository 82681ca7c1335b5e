//! Conversation message API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_text, success, ApiResponse, ApiResult};
use crate::models::{ConversationMessage, CreateMessageRequest};
use crate::AppState;

/// GET /api/artifacts/:id/messages - Conversation, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ConversationMessage>> {
    success(state.repo.list_messages(&id).await?)
}

/// POST /api/artifacts/:id/messages - Record a message.
pub async fn add_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CreateMessageRequest>,
) -> ApiResult<ConversationMessage> {
    require_text(&request.message, "message")?;

    let message = state.repo.add_message(&id, &request).await?;
    Ok(ApiResponse::created(message))
}
