//! Newtype wrappers for the opaque 128-bit ids used throughout the system.
//!
//! Every id is a UUID (v7, time-ordered) rather than a sequential integer,
//! per the "128-bit opaque identifiers generated at row creation" data
//! model rule. The newtypes exist to prevent mixing up different kinds of
//! ids at call sites.

use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Chat id
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type, ToSchema,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ChatId(pub Uuid);

/// User id
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type, ToSchema,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

/// Message id
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type, ToSchema,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

/// Client-generated id carried on `text`/`media` frames for idempotent retry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type, ToSchema,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ClientMessageId(pub Uuid);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClientMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ChatId {
    fn from(id: Uuid) -> Self {
        ChatId(id)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        UserId(id)
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        MessageId(id)
    }
}

impl From<Uuid> for ClientMessageId {
    fn from(id: Uuid) -> Self {
        ClientMessageId(id)
    }
}

impl From<ChatId> for Uuid {
    fn from(id: ChatId) -> Self {
        id.0
    }
}

impl From<UserId> for Uuid {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl From<MessageId> for Uuid {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

impl From<ClientMessageId> for Uuid {
    fn from(id: ClientMessageId) -> Self {
        id.0
    }
}

impl ChatId {
    pub fn new() -> Self {
        ChatId(Uuid::now_v7())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl UserId {
    pub fn new() -> Self {
        UserId(Uuid::now_v7())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl MessageId {
    pub fn new() -> Self {
        MessageId(Uuid::now_v7())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl ClientMessageId {
    pub fn new() -> Self {
        ClientMessageId(Uuid::now_v7())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ChatId {
    fn default() -> Self {
        ChatId(Uuid::nil())
    }
}

impl Default for UserId {
    fn default() -> Self {
        UserId(Uuid::nil())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        MessageId(Uuid::nil())
    }
}

impl Default for ClientMessageId {
    fn default() -> Self {
        ClientMessageId(Uuid::nil())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation_is_not_nil() {
        let user_id = UserId::new();
        assert_ne!(user_id.inner(), Uuid::nil());
    }

    #[test]
    fn test_id_conversion() {
        let raw = Uuid::now_v7();
        let chat_id = ChatId::from(raw);
        let back: Uuid = chat_id.into();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_id_display_matches_uuid_display() {
        let raw = Uuid::now_v7();
        let message_id = MessageId::from(raw);
        assert_eq!(format!("{}", message_id), raw.to_string());
    }

    #[test]
    fn test_id_equality() {
        let raw = Uuid::now_v7();
        let id1 = ClientMessageId::from(raw);
        let id2 = ClientMessageId::from(raw);
        let id3 = ClientMessageId::new();

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_v7_ids_are_time_ordered() {
        let first = MessageId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = MessageId::new();

        assert!(first < second);
    }

    #[test]
    fn test_default_is_nil() {
        assert_eq!(ChatId::default().inner(), Uuid::nil());
    }
}
