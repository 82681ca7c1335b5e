//! Artifact model: the generated deliverable and its current-version pointer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who can see an artifact.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
    Unlisted,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Unlisted => "unlisted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            "unlisted" => Some(Visibility::Unlisted),
            _ => None,
        }
    }
}

/// A generated artifact ("game") with its mutable current-version pointer.
///
/// `content` and `instructions` are copies of the version numbered
/// `current_version`; they are only ever written together with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub title: String,
    pub prompt: String,
    pub category: String,
    pub visibility: Visibility,
    pub owner_id: String,
    /// `None` until the first version is committed
    pub current_version: Option<i64>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating an artifact from freshly generated content.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtifactRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub prompt: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub visibility: Visibility,
    pub owner_id: String,
    /// Content of version 1, when generation already finished
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

fn default_category() -> String {
    "game".to_string()
}

/// Request body for updating artifact metadata. Content only changes through versions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArtifactRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

/// Query filters for listing artifacts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactFilter {
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub owner_id: Option<String>,
}
