//! The `DomainEvent` contract: the in-flight, never-persisted-by-the-core
//! envelope that flows from the event publisher through the broker to the
//! notification worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// An immutable record of something that happened in a domain service,
/// routed via a topic-style broker for async consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    /// Dot-delimited routing key, e.g. `chat.message.sent`.
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: Value,
    pub content_type: String,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, payload: Value) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event_type.into(),
            source: source.into(),
            occurred_at: Utc::now(),
            payload,
            content_type: "application/json".to_string(),
        }
    }
}

/// Routing key constants for the events this system actually produces.
pub mod routing_keys {
    pub const CHAT_MESSAGE_SENT: &str = "chat.message.sent";
    pub const CHAT_MESSAGE_UNSENT: &str = "chat.message.unsent";
    pub const CHAT_MESSAGE_DELETED: &str = "chat.message.deleted_for_all";
    pub const CHAT_PARTICIPANT_ADDED: &str = "chat.participant.added";
    pub const CHAT_PARTICIPANT_REMOVED: &str = "chat.participant.removed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_has_fresh_uuid_and_json_content_type() {
        let event = DomainEvent::new(
            routing_keys::CHAT_MESSAGE_SENT,
            "chat_server",
            serde_json::json!({"message_id": "abc"}),
        );
        assert_eq!(event.event_type, "chat.message.sent");
        assert_eq!(event.content_type, "application/json");
        assert_ne!(event.event_id, Uuid::nil());
    }

    #[test]
    fn serializes_type_field_under_reserved_json_keyword() {
        let event = DomainEvent::new(routing_keys::CHAT_MESSAGE_SENT, "chat_server", Value::Null);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "chat.message.sent");
    }
}
