//! Read side of the version history: what the version picker shows.

use crate::models::Version;

/// How a caller names the version it wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    Id(String),
    Number(i64),
}

impl std::fmt::Display for VersionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionRef::Id(id) => write!(f, "version {}", id),
            VersionRef::Number(n) => write!(f, "version {}", n),
        }
    }
}

/// Sort newest first and keep one version per number.
///
/// Retried or racing appends can leave several rows with one number; the
/// earliest-created row is the one kept.
pub fn dedupe_newest_first(mut versions: Vec<Version>) -> Vec<Version> {
    versions.sort_by(|a, b| {
        b.version_number
            .cmp(&a.version_number)
            .then(a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    versions.dedup_by_key(|v| v.version_number);
    versions
}

/// Find the version a reference points at.
pub fn find<'a>(versions: &'a [Version], target: &VersionRef) -> Option<&'a Version> {
    versions.iter().find(|v| match target {
        VersionRef::Id(id) => &v.id == id,
        VersionRef::Number(n) => v.version_number == *n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn version(id: &str, number: i64, at_secs: i64) -> Version {
        Version {
            id: id.to_string(),
            artifact_id: "artifact".to_string(),
            version_number: number,
            content: format!("<html>{}</html>", id),
            instructions: None,
            created_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_orders_newest_first() {
        let sorted = dedupe_newest_first(vec![
            version("a", 1, 10),
            version("c", 3, 30),
            version("b", 2, 20),
        ]);
        let numbers: Vec<i64> = sorted.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[test]
    fn test_duplicate_numbers_keep_earliest_row() {
        let sorted = dedupe_newest_first(vec![
            version("retry", 2, 25),
            version("a", 1, 10),
            version("original", 2, 20),
        ]);

        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].id, "original");
        assert_eq!(sorted[1].id, "a");
    }

    #[test]
    fn test_empty_history_stays_empty() {
        assert!(dedupe_newest_first(Vec::new()).is_empty());
    }

    #[test]
    fn test_find_by_id_and_number() {
        let versions = vec![version("a", 1, 10), version("b", 2, 20)];

        assert_eq!(find(&versions, &VersionRef::Number(2)).unwrap().id, "b");
        assert_eq!(
            find(&versions, &VersionRef::Id("a".into())).unwrap().version_number,
            1
        );
        assert!(find(&versions, &VersionRef::Number(7)).is_none());
        assert!(find(&versions, &VersionRef::Id("zzz".into())).is_none());
    }
}
