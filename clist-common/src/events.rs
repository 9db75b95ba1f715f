//! Event types for the match event system
//!
//! Provides the shared `MatchEvent` enum and the `EventBus` used to broadcast
//! it to SSE subscribers and other in-process listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// How a mention was resolved to a canonical vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResolution {
    /// Existing vendor in the session community (exact match or search hit)
    Existing,
    /// New vendor created by the admin
    Created,
    /// Vendor copied in from another community
    Copied,
}

/// Events emitted by the vendor matching workflow
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatchEvent {
    /// Admin opened a match session
    MatchSessionOpened {
        session_id: Uuid,
        community: String,
        queue_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// Mention resolved to a canonical vendor
    MentionMatched {
        session_id: Uuid,
        mention_id: Uuid,
        vendor_id: Uuid,
        resolution: MatchResolution,
        timestamp: DateTime<Utc>,
    },

    /// Mention left unmatched
    MentionSkipped {
        session_id: Uuid,
        mention_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A create/copy/match write failed; the mention stays current
    MatchActionFailed {
        session_id: Uuid,
        mention_id: Option<Uuid>,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Every mention in the queue has a terminal outcome
    MatchSessionCompleted {
        session_id: Uuid,
        matched: usize,
        skipped: usize,
        timestamp: DateTime<Utc>,
    },

    /// Admin dismissed the session before completion
    MatchSessionClosed {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl MatchEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            MatchEvent::MatchSessionOpened { .. } => "MatchSessionOpened",
            MatchEvent::MentionMatched { .. } => "MentionMatched",
            MatchEvent::MentionSkipped { .. } => "MentionSkipped",
            MatchEvent::MatchActionFailed { .. } => "MatchActionFailed",
            MatchEvent::MatchSessionCompleted { .. } => "MatchSessionCompleted",
            MatchEvent::MatchSessionClosed { .. } => "MatchSessionClosed",
        }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            MatchEvent::MatchSessionOpened { session_id, .. }
            | MatchEvent::MentionMatched { session_id, .. }
            | MatchEvent::MentionSkipped { session_id, .. }
            | MatchEvent::MatchActionFailed { session_id, .. }
            | MatchEvent::MatchSessionCompleted { session_id, .. }
            | MatchEvent::MatchSessionClosed { session_id, .. } => *session_id,
        }
    }
}

/// Broadcast channel for `MatchEvent`s
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MatchEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    ///
    /// # Examples
    ///
    /// ```
    /// use clist_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: MatchEvent) -> Result<usize, broadcast::error::SendError<MatchEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MatchEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = MatchEvent::MentionMatched {
            session_id: Uuid::new_v4(),
            mention_id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            resolution: MatchResolution::Copied,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MentionMatched");
        assert_eq!(json["resolution"], "copied");
        assert_eq!(event.event_type(), "MentionMatched");
    }

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let session_id = Uuid::new_v4();

        bus.emit(MatchEvent::MatchSessionClosed {
            session_id,
            timestamp: Utc::now(),
        })
        .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.session_id(), session_id);
    }

    #[test]
    fn test_emit_without_subscribers_errors_but_lossy_does_not() {
        let bus = EventBus::new(10);
        let event = MatchEvent::MatchSessionClosed {
            session_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };

        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
