//! In-process history event bus backed by a `tokio::sync::broadcast` channel.
//!
//! The bus lives in `AppState` and is handed to whatever needs it; there is
//! no process-wide registry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::Version;

/// Something that changed in an artifact's history.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HistoryEvent {
    /// New content became the current version.
    #[serde(rename_all = "camelCase")]
    VersionCommitted {
        artifact_id: String,
        version_number: i64,
        at: DateTime<Utc>,
    },
    /// A revert appended `version_number` as a copy of `reverted_to`.
    #[serde(rename_all = "camelCase")]
    Reverted {
        artifact_id: String,
        version_number: i64,
        reverted_to: i64,
        at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    ArtifactDeleted {
        artifact_id: String,
        at: DateTime<Utc>,
    },
}

impl HistoryEvent {
    pub fn committed(version: &Version) -> Self {
        HistoryEvent::VersionCommitted {
            artifact_id: version.artifact_id.clone(),
            version_number: version.version_number,
            at: version.created_at,
        }
    }

    pub fn reverted(version: &Version, reverted_to: i64) -> Self {
        HistoryEvent::Reverted {
            artifact_id: version.artifact_id.clone(),
            version_number: version.version_number,
            reverted_to,
            at: version.created_at,
        }
    }

    pub fn deleted(artifact_id: &str) -> Self {
        HistoryEvent::ArtifactDeleted {
            artifact_id: artifact_id.to_string(),
            at: Utc::now(),
        }
    }

    pub fn artifact_id(&self) -> &str {
        match self {
            HistoryEvent::VersionCommitted { artifact_id, .. }
            | HistoryEvent::Reverted { artifact_id, .. }
            | HistoryEvent::ArtifactDeleted { artifact_id, .. } => artifact_id,
        }
    }

    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            HistoryEvent::VersionCommitted { .. } => "versionCommitted",
            HistoryEvent::Reverted { .. } => "reverted",
            HistoryEvent::ArtifactDeleted { .. } => "artifactDeleted",
        }
    }
}

/// Fan-out bus for [`HistoryEvent`]s.
///
/// When a subscriber falls more than `capacity` events behind, it loses the
/// oldest ones and observes `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<HistoryEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers. Returns how many received it.
    pub fn publish(&self, event: HistoryEvent) -> usize {
        // A send error only means nobody is listening.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(number: i64) -> Version {
        Version {
            id: format!("v{}", number),
            artifact_id: "game-1".to_string(),
            version_number: number,
            content: "<canvas></canvas>".to_string(),
            instructions: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.publish(HistoryEvent::committed(&version(2))), 2);

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                HistoryEvent::VersionCommitted { version_number, .. } => {
                    assert_eq!(version_number, 2)
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(HistoryEvent::deleted("game-1")), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for n in 1..=4 {
            bus.publish(HistoryEvent::committed(&version(n)));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        let next = rx.recv().await.unwrap();
        assert!(matches!(
            next,
            HistoryEvent::VersionCommitted {
                version_number: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = HistoryEvent::reverted(&version(6), 1);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "reverted");
        assert_eq!(json["artifactId"], "game-1");
        assert_eq!(json["versionNumber"], 6);
        assert_eq!(json["revertedTo"], 1);
        assert_eq!(event.kind(), "reverted");
    }
}
