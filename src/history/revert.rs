//! Forward-only revert: restoring old content always appends a new version.

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::Version;

use super::{correlate, list_versions, selector, VersionRef};

/// A committed revert: the new version and the number whose content it copies.
#[derive(Debug, Clone)]
pub struct Revert {
    pub version: Version,
    pub reverted_to: i64,
}

/// Instructions note recorded on a version produced by a revert.
pub fn revert_note(version_number: i64) -> String {
    format!("Reverted to version {}", version_number)
}

/// Copy `target`'s content into a new current version.
///
/// Reverting to the version that is already current still appends.
pub async fn revert_to_version(
    repo: &Repository,
    artifact_id: &str,
    target: &VersionRef,
) -> Result<Revert, AppError> {
    let versions = list_versions(repo, artifact_id).await?;
    if versions.is_empty() {
        return Err(AppError::InvalidState(format!(
            "Artifact {} has no version history",
            artifact_id
        )));
    }

    let target = selector::find(&versions, target).ok_or_else(|| {
        AppError::NotFound(format!("{} of artifact {} not found", target, artifact_id))
    })?;

    commit_revert(repo, target).await
}

/// Undo the change tied to a conversation message.
pub async fn revert_to_message(
    repo: &Repository,
    artifact_id: &str,
    message_id: &str,
) -> Result<Revert, AppError> {
    let message = repo
        .get_message(message_id)
        .await?
        .filter(|m| m.artifact_id == artifact_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Message {} not found on artifact {}",
                message_id, artifact_id
            ))
        })?;

    let versions = list_versions(repo, artifact_id).await?;
    let target = correlate::resolve_message_target(&versions, message.created_at)?;

    tracing::debug!(
        artifact_id,
        message_id,
        target = target.version_number,
        "Resolved message to version"
    );

    commit_revert(repo, target).await
}

async fn commit_revert(repo: &Repository, target: &Version) -> Result<Revert, AppError> {
    let note = revert_note(target.version_number);
    let reverted = repo
        .commit_version(&target.artifact_id, &target.content, Some(&note))
        .await?;

    tracing::info!(
        artifact_id = %target.artifact_id,
        from = target.version_number,
        to = reverted.version_number,
        "Reverted artifact"
    );

    Ok(Revert {
        version: reverted,
        reverted_to: target.version_number,
    })
}
