//! Message operations: authorization, persistence, and hub broadcast,
//! grounded in
//! `fechatter_server::domains::messaging::messaging_domain::MessageDomainServiceImpl`,
//! generalized to wire in the hub broadcast step the teacher left as
//! `// TODO: Publish MessageSent event`. Domain-event emission happens one
//! layer down, inside the repository's own transaction (see
//! `super::repository`), rather than here.

use std::sync::Arc;

use async_trait::async_trait;
use chat_core::error::CoreError;
use chat_core::{ChatId, ClientMessageId, MediaType, Message, MessageCursor, MessageId, UserId};
use chrono::Utc;
use uuid::Uuid;

use crate::domains::chat::repository::ChatRepository;
use crate::hub::{ChatHub, SessionId};

use super::repository::{MessageRepository, NewMessage};

#[derive(Debug, Clone)]
pub struct MessageConfig {
    pub max_content_length: usize,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_content_length: 10_000,
        }
    }
}

pub struct SendMessageInput {
    pub content: String,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
    pub reply_to_message_id: Option<MessageId>,
    pub client_message_id: Uuid,
}

#[async_trait]
pub trait MessageDomainService: Send + Sync {
    async fn send_message(
        &self,
        chat_id: ChatId,
        caller: UserId,
        input: SendMessageInput,
        exclude_session: Option<SessionId>,
    ) -> Result<Message, CoreError>;

    async fn unsend_message(&self, message_id: MessageId, caller: UserId) -> Result<Message, CoreError>;

    async fn delete_for_all(&self, message_id: MessageId, caller: UserId) -> Result<Message, CoreError>;

    async fn delete_for_sender(&self, message_id: MessageId, caller: UserId) -> Result<(), CoreError>;

    async fn list_messages(
        &self,
        chat_id: ChatId,
        caller: UserId,
        before: Option<MessageCursor>,
        limit: u32,
    ) -> Result<Vec<Message>, CoreError>;

    async fn mark_read(&self, message_id: MessageId, chat_id: ChatId, caller: UserId) -> Result<(), CoreError>;
}

pub struct MessageDomainServiceImpl {
    messages: Arc<MessageRepository>,
    chats: Arc<ChatRepository>,
    hub: ChatHub,
    config: MessageConfig,
}

impl MessageDomainServiceImpl {
    pub fn new(messages: Arc<MessageRepository>, chats: Arc<ChatRepository>, hub: ChatHub, config: MessageConfig) -> Self {
        Self {
            messages,
            chats,
            hub,
            config,
        }
    }

    fn validate_content(&self, content: &str) -> Result<(), CoreError> {
        if content.len() > self.config.max_content_length {
            return Err(CoreError::Validation(format!(
                "message content too long, max {} characters",
                self.config.max_content_length
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageDomainService for MessageDomainServiceImpl {
    async fn send_message(
        &self,
        chat_id: ChatId,
        caller: UserId,
        input: SendMessageInput,
        exclude_session: Option<SessionId>,
    ) -> Result<Message, CoreError> {
        // Membership gate: non-members are refused before anything is written.
        if !self.chats.role_of(chat_id, caller).await?.can_send() {
            return Err(CoreError::Forbidden);
        }
        self.validate_content(&input.content)?;

        let message = self
            .messages
            .append_message(
                chat_id,
                caller,
                NewMessage {
                    content: input.content,
                    media_url: input.media_url,
                    media_type: input.media_type,
                    reply_to_message_id: input.reply_to_message_id,
                    client_message_id: ClientMessageId::from(input.client_message_id),
                },
            )
            .await?;

        // Broadcast to every participant including the sender, so the sender
        // can reconcile its optimistic copy by `client_message_id`.
        self.hub.broadcast(
            chat_id,
            "message.new",
            serde_json::json!({
                "message_id": message.id,
                "client_message_id": message.client_message_id,
                "sender_id": message.sender_id,
                "content": message.content,
                "sent_at": message.sent_at,
            }),
            exclude_session,
        );

        // Event emission happens through the outbox row `append_message`
        // wrote in the same transaction as the message; `OutboxFlusher`
        // delivers it to the broker.
        Ok(message)
    }

    async fn unsend_message(&self, message_id: MessageId, caller: UserId) -> Result<Message, CoreError> {
        let message = self.messages.unsend_message(message_id, caller, Utc::now()).await?;

        self.hub.broadcast(
            message.chat_id,
            "message.unsent",
            serde_json::json!({"message_id": message.id}),
            None,
        );

        Ok(message)
    }

    async fn delete_for_all(&self, message_id: MessageId, caller: UserId) -> Result<Message, CoreError> {
        let message = self.messages.soft_delete_for_all(message_id, caller).await?;

        self.hub.broadcast(
            message.chat_id,
            "message.deleted_for_all",
            serde_json::json!({"message_id": message.id}),
            None,
        );

        Ok(message)
    }

    async fn delete_for_sender(&self, message_id: MessageId, caller: UserId) -> Result<(), CoreError> {
        self.messages.soft_delete_for_sender(message_id, caller).await
    }

    async fn list_messages(
        &self,
        chat_id: ChatId,
        caller: UserId,
        before: Option<MessageCursor>,
        limit: u32,
    ) -> Result<Vec<Message>, CoreError> {
        if !self.chats.role_of(chat_id, caller).await?.can_read() {
            return Err(CoreError::Forbidden);
        }
        self.messages.list_messages(chat_id, caller, before, limit).await
    }

    async fn mark_read(&self, message_id: MessageId, chat_id: ChatId, caller: UserId) -> Result<(), CoreError> {
        if !self.chats.role_of(chat_id, caller).await?.can_read() {
            return Err(CoreError::Forbidden);
        }
        self.messages.mark_read(message_id).await?;
        self.hub.broadcast(
            chat_id,
            "read_receipt",
            serde_json::json!({"message_id": message_id, "user_id": caller}),
            None,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_content_length_matches_10k() {
        assert_eq!(MessageConfig::default().max_content_length, 10_000);
    }
}
