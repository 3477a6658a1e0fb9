//! Core domain models shared by `chat_server` and `notify_server`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ids::{ChatId, ClientMessageId, MessageId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Gif,
    Video,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Chat {
    pub id: ChatId,
    pub is_group: bool,
    /// Present iff `is_group`.
    pub name: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Participant {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
    pub is_admin: bool,
}

/// Sentinel string substituted for `content` when a message has been unsent
/// or deleted-for-all. Never persisted, applied at read time instead.
pub const UNSENT_SENTINEL: &str = "this message was unsent";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
    pub reply_to_message_id: Option<MessageId>,
    pub client_message_id: ClientMessageId,
    pub sent_at: DateTime<Utc>,
    pub unsent: bool,
    pub unsent_at: Option<DateTime<Utc>>,
    pub deleted_for_sender: bool,
    pub deleted_for_all: bool,
    pub is_read: bool,
    pub is_edited: bool,
}

impl Message {
    /// Apply the read-time masking rule: unsent or deleted-for-all messages
    /// keep their row (for ordering) but never show their original content.
    pub fn mask_if_unsent(mut self) -> Self {
        if self.unsent || self.deleted_for_all {
            self.content = UNSENT_SENTINEL.to_string();
            self.media_url = None;
            self.media_type = None;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PerUserChatDeletion {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub deleted_at: DateTime<Utc>,
}

/// Request DTO for creating a chat.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateChat {
    pub is_group: bool,
    pub name: Option<String>,
    pub participants: Vec<UserId>,
}

/// Request DTO for sending a message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessage {
    pub content: String,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
    pub reply_to_message_id: Option<MessageId>,
    #[serde(default = "Uuid::now_v7")]
    pub client_message_id: Uuid,
}

/// Keyset cursor for `ListMessages`: `(sent_at, message_id)`, never offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct MessageCursor {
    pub sent_at: DateTime<Utc>,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListMessagesQuery {
    pub before: Option<MessageCursor>,
    pub limit: u32,
}

impl Default for ListMessagesQuery {
    fn default() -> Self {
        Self {
            before: None,
            limit: 50,
        }
    }
}

/// Membership role, derived rather than persisted directly (`is_admin`
/// plus "row exists at all" fully determine it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    NonMember,
    Member,
    Admin,
}

impl ChatRole {
    pub fn can_read(&self) -> bool {
        !matches!(self, ChatRole::NonMember)
    }

    pub fn can_send(&self) -> bool {
        !matches!(self, ChatRole::NonMember)
    }

    pub fn can_manage_membership(&self) -> bool {
        matches!(self, ChatRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_if_unsent_replaces_content_and_media() {
        let msg = Message {
            id: MessageId::new(),
            chat_id: ChatId::new(),
            sender_id: UserId::new(),
            content: "secret".into(),
            media_url: Some("https://example.com/x.png".into()),
            media_type: Some(MediaType::Image),
            reply_to_message_id: None,
            client_message_id: ClientMessageId::new(),
            sent_at: Utc::now(),
            unsent: true,
            unsent_at: Some(Utc::now()),
            deleted_for_sender: false,
            deleted_for_all: false,
            is_read: false,
            is_edited: false,
        }
        .mask_if_unsent();

        assert_eq!(msg.content, UNSENT_SENTINEL);
        assert!(msg.media_url.is_none());
    }

    #[test]
    fn chat_role_permissions() {
        assert!(!ChatRole::NonMember.can_send());
        assert!(ChatRole::Member.can_send());
        assert!(!ChatRole::Member.can_manage_membership());
        assert!(ChatRole::Admin.can_manage_membership());
    }
}
