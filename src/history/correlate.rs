//! Maps a conversation message to the version an undo of it should restore.
//!
//! Messages and versions share no key; they are matched by timestamp only.

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::Version;

/// Resolve the revert target for a message sent at `message_at`.
///
/// The target is the earliest version created strictly after the message.
/// When the message is newer than every version, the oldest version overall
/// is used instead.
pub fn resolve_message_target(
    versions: &[Version],
    message_at: DateTime<Utc>,
) -> Result<&Version, AppError> {
    let chronological = |v: &&Version| (v.created_at, v.version_number);

    versions
        .iter()
        .filter(|v| v.created_at > message_at)
        .min_by_key(chronological)
        .or_else(|| versions.iter().min_by_key(chronological))
        .ok_or_else(|| {
            AppError::NoSuitableVersion("Artifact has no versions to revert to".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn versions_at(times: &[i64]) -> Vec<Version> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| Version {
                id: format!("v{}", i + 1),
                artifact_id: "artifact".to_string(),
                version_number: i as i64 + 1,
                content: format!("content {}", i + 1),
                instructions: None,
                created_at: at(*t),
            })
            .collect()
    }

    #[test]
    fn test_picks_earliest_version_after_message() {
        let versions = versions_at(&[1000, 2000, 3000, 4000]);
        let target = resolve_message_target(&versions, at(2500)).unwrap();
        assert_eq!(target.version_number, 3);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut versions = versions_at(&[1000, 2000, 3000, 4000]);
        versions.reverse();
        let target = resolve_message_target(&versions, at(2500)).unwrap();
        assert_eq!(target.version_number, 3);
    }

    #[test]
    fn test_version_at_same_instant_is_not_after() {
        let versions = versions_at(&[1000, 2000, 3000]);
        let target = resolve_message_target(&versions, at(2000)).unwrap();
        assert_eq!(target.version_number, 3);
    }

    #[test]
    fn test_message_after_all_versions_falls_back_to_oldest() {
        let versions = versions_at(&[1000, 2000, 3000]);
        let target = resolve_message_target(&versions, at(5000)).unwrap();
        assert_eq!(target.version_number, 1);
    }

    #[test]
    fn test_no_versions_is_no_suitable_version() {
        let err = resolve_message_target(&[], at(1000)).unwrap_err();
        assert!(matches!(err, AppError::NoSuitableVersion(_)));
    }
}
