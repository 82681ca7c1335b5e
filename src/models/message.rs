//! Conversation messages exchanged while iterating on an artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message tied to an artifact. Linked to versions only by time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub artifact_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for recording a conversation message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub message: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub is_system: bool,
}
