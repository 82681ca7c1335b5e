//! Immutable version snapshots of an artifact's content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One numbered snapshot in an artifact's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub artifact_id: String,
    pub version_number: i64,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Version list as shown by the version selector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistory {
    pub artifact_id: String,
    pub current_version: Option<i64>,
    /// Newest first, one entry per version number
    pub versions: Vec<Version>,
}

/// Request body for appending generated content as a new current version.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendVersionRequest {
    pub content: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Request body for reverting. Exactly one of the fields must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertRequest {
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub version_number: Option<i64>,
}
