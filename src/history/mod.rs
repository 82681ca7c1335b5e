//! Version history core: selector, revert operator and message correlator.
//!
//! Everything here works on top of [`Repository`]; no operation mutates an
//! existing version.

mod correlate;
mod revert;
mod selector;

pub use revert::{revert_to_message, revert_to_version, Revert};
pub use selector::VersionRef;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{RevertRequest, Version, VersionHistory};

/// Versions of an artifact, newest first, one per version number.
pub async fn list_versions(repo: &Repository, artifact_id: &str) -> Result<Vec<Version>, AppError> {
    let stored = repo.list_versions(artifact_id).await?;
    Ok(selector::dedupe_newest_first(stored))
}

/// The version list together with the artifact's current pointer.
pub async fn version_history(
    repo: &Repository,
    artifact_id: &str,
) -> Result<VersionHistory, AppError> {
    let artifact = repo
        .get_artifact(artifact_id)
        .await?
        .ok_or_else(|| AppError::artifact_not_found(artifact_id))?;
    let versions = list_versions(repo, artifact_id).await?;

    Ok(VersionHistory {
        artifact_id: artifact.id,
        current_version: artifact.current_version,
        versions,
    })
}

impl TryFrom<&RevertRequest> for VersionRef {
    type Error = AppError;

    fn try_from(request: &RevertRequest) -> Result<Self, Self::Error> {
        match (&request.version_id, request.version_number) {
            (Some(id), None) if !id.trim().is_empty() => Ok(VersionRef::Id(id.clone())),
            (None, Some(n)) if n >= 1 => Ok(VersionRef::Number(n)),
            (None, Some(n)) => Err(AppError::Validation(format!(
                "versionNumber must be at least 1, got {}",
                n
            ))),
            (Some(_), Some(_)) => Err(AppError::Validation(
                "Provide either versionId or versionNumber, not both".to_string(),
            )),
            _ => Err(AppError::Validation(
                "versionId or versionNumber is required".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_request_requires_exactly_one_target() {
        let by_number = RevertRequest {
            version_id: None,
            version_number: Some(2),
        };
        assert_eq!(VersionRef::try_from(&by_number).unwrap(), VersionRef::Number(2));

        let by_id = RevertRequest {
            version_id: Some("abc".into()),
            version_number: None,
        };
        assert_eq!(
            VersionRef::try_from(&by_id).unwrap(),
            VersionRef::Id("abc".into())
        );

        let both = RevertRequest {
            version_id: Some("abc".into()),
            version_number: Some(2),
        };
        assert!(matches!(
            VersionRef::try_from(&both),
            Err(AppError::Validation(_))
        ));

        assert!(VersionRef::try_from(&RevertRequest::default()).is_err());
        let zero = RevertRequest {
            version_id: None,
            version_number: Some(0),
        };
        assert!(VersionRef::try_from(&zero).is_err());
    }
}
