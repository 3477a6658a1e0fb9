//! Message persistence, grounded in
//! `fechatter_server::domains::messaging::messaging_domain` /
//! `fechatter_server::domains::chat::repository` transaction style.

use std::sync::Arc;

use chat_core::error::CoreError;
use chat_core::events::routing_keys;
use chat_core::{ChatId, ClientMessageId, MediaType, Message, MessageCursor, MessageId, UserId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::outbox_store::PgOutboxStore;

/// A message can be unsent within 60 seconds of being sent.
pub const UNSEND_WINDOW: chrono::Duration = chrono::Duration::seconds(60);

pub struct MessageRepository {
    pool: Arc<PgPool>,
}

pub struct NewMessage {
    pub content: String,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
    pub reply_to_message_id: Option<MessageId>,
    pub client_message_id: ClientMessageId,
}

impl MessageRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// `AppendMessage(msg) → Message` with monotonic server-side `sent_at`
    /// and idempotent retry via the `(sender_id, client_message_id)` unique
    /// index: resending the same client-generated id after a dropped ack
    /// returns the original row instead of creating a duplicate.
    pub async fn append_message(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        msg: NewMessage,
    ) -> Result<Message, CoreError> {
        if msg.content.trim().is_empty() && msg.media_url.is_none() {
            return Err(CoreError::Validation(
                "message must contain either text content or media".into(),
            ));
        }
        if let Some(reply_id) = msg.reply_to_message_id {
            let in_chat: Option<(ChatId,)> =
                sqlx::query_as(r#"select chat_id from messages where id = $1"#)
                    .bind(reply_id)
                    .fetch_optional(self.pool.as_ref())
                    .await
                    .map_err(CoreError::from_database_error)?;
            match in_chat {
                Some((found_chat,)) if found_chat == chat_id => {}
                _ => {
                    return Err(CoreError::Validation(
                        "reply_to_message_id must reference a message in the same chat".into(),
                    ));
                }
            }
        }

        let message_id = MessageId::new();
        let mut tx = self.pool.begin().await.map_err(CoreError::from_database_error)?;

        let inserted = sqlx::query_as::<_, Message>(
            r#"insert into messages
                      (id, chat_id, sender_id, content, media_url, media_type,
                        reply_to_message_id, client_message_id)
                  values ($1, $2, $3, $4, $5, $6, $7, $8)
                  on conflict (sender_id, client_message_id) do nothing
                  returning id, chat_id, sender_id, content, media_url, media_type,
                                      reply_to_message_id, client_message_id, sent_at, unsent,
                                      unsent_at, deleted_for_sender, deleted_for_all, is_read, is_edited"#,
        )
        .bind(message_id)
        .bind(chat_id)
        .bind(sender_id)
        .bind(&msg.content)
        .bind(&msg.media_url)
        .bind(&msg.media_type)
        .bind(msg.reply_to_message_id)
        .bind(msg.client_message_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CoreError::from_database_error)?;

        let message = match inserted {
            Some(message) => {
                // The outbox row commits in the same transaction as the message
                // row, so the domain write and the event emission can never
                // diverge.
                PgOutboxStore::insert_in_tx(
                    &mut tx,
                    routing_keys::CHAT_MESSAGE_SENT,
                    "chat_server",
                    serde_json::json!({
                        "message_id": message.id,
                        "chat_id": message.chat_id,
                        "sender_id": message.sender_id,
                    }),
                )
                .await
                .map_err(CoreError::from_database_error)?;
                tx.commit().await.map_err(CoreError::from_database_error)?;
                message
            }
            // The insert was skipped by ON CONFLICT DO NOTHING: this
            // (sender_id, client_message_id) pair was already seen. Return the
            // canonical row instead of re-inserting or re-publishing.
            None => {
                tx.rollback().await.map_err(CoreError::from_database_error)?;
                self
                    .find_by_sender_and_client_id(sender_id, msg.client_message_id)
                    .await?
                    .ok_or_else(|| {
                        CoreError::Internal("conflicting insert vanished before it could be re-read".into())
                    })?
            }
        };

        Ok(message)
    }

    async fn find_by_sender_and_client_id(
        &self,
        sender_id: UserId,
        client_message_id: ClientMessageId,
    ) -> Result<Option<Message>, CoreError> {
        sqlx::query_as::<_, Message>(
            r#"select id, chat_id, sender_id, content, media_url, media_type,
                                reply_to_message_id, client_message_id, sent_at, unsent,
                                unsent_at, deleted_for_sender, deleted_for_all, is_read, is_edited
                  from messages where sender_id = $1 and client_message_id = $2"#,
        )
        .bind(sender_id)
        .bind(client_message_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(CoreError::from_database_error)
    }

    pub async fn get_message(&self, message_id: MessageId) -> Result<Option<Message>, CoreError> {
        sqlx::query_as::<_, Message>(
            r#"select id, chat_id, sender_id, content, media_url, media_type,
                                reply_to_message_id, client_message_id, sent_at, unsent,
                                unsent_at, deleted_for_sender, deleted_for_all, is_read, is_edited
                  from messages where id = $1"#,
        )
        .bind(message_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(CoreError::from_database_error)
    }

    /// `ListMessages(chat_id, before, limit, caller) → page`: descending
    /// `sent_at`, keyset cursor, filters caller's soft-deletes, masks unsent
    /// content.
    pub async fn list_messages(
        &self,
        chat_id: ChatId,
        caller: UserId,
        before: Option<MessageCursor>,
        limit: u32,
    ) -> Result<Vec<Message>, CoreError> {
        let limit = limit.min(100) as i64;

        let rows = match before {
            Some(cursor) => {
                sqlx::query_as::<_, Message>(
                    r#"select m.id, m.chat_id, m.sender_id, m.content, m.media_url, m.media_type,
                                        m.reply_to_message_id, m.client_message_id, m.sent_at, m.unsent,
                                        m.unsent_at, m.deleted_for_sender, m.deleted_for_all, m.is_read, m.is_edited
                          from messages m
                          where m.chat_id = $1
                              and (m.sent_at, m.id) < ($2, $3)
                              and not (m.sender_id = $4 and m.deleted_for_sender)
                              and not m.deleted_for_all
                          order by m.sent_at desc, m.id desc
                          limit $5"#,
                )
                .bind(chat_id)
                .bind(cursor.sent_at)
                .bind(cursor.message_id)
                .bind(caller)
                .bind(limit)
                .fetch_all(self.pool.as_ref())
                .await
            }
            None => {
                sqlx::query_as::<_, Message>(
                    r#"select m.id, m.chat_id, m.sender_id, m.content, m.media_url, m.media_type,
                                        m.reply_to_message_id, m.client_message_id, m.sent_at, m.unsent,
                                        m.unsent_at, m.deleted_for_sender, m.deleted_for_all, m.is_read, m.is_edited
                          from messages m
                          where m.chat_id = $1
                              and not (m.sender_id = $2 and m.deleted_for_sender)
                              and not m.deleted_for_all
                          order by m.sent_at desc, m.id desc
                          limit $3"#,
                )
                .bind(chat_id)
                .bind(caller)
                .bind(limit)
                .fetch_all(self.pool.as_ref())
                .await
            }
        }
        .map_err(CoreError::from_database_error)?;

        Ok(rows.into_iter().map(Message::mask_if_unsent).collect())
    }

    /// Atomic read-modify-write guarded by the 60-second unsend window.
    pub async fn unsend_message(
        &self,
        message_id: MessageId,
        caller: UserId,
        now: DateTime<Utc>,
    ) -> Result<Message, CoreError> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from_database_error)?;

        let message = sqlx::query_as::<_, Message>(
            r#"select id, chat_id, sender_id, content, media_url, media_type,
                                reply_to_message_id, client_message_id, sent_at, unsent,
                                unsent_at, deleted_for_sender, deleted_for_all, is_read, is_edited
                  from messages where id = $1 for update"#,
        )
        .bind(message_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CoreError::from_database_error)?
        .ok_or_else(|| CoreError::NotFound(format!("message {message_id} not found")))?;

        if message.sender_id != caller {
            return Err(CoreError::Forbidden);
        }
        if now - message.sent_at > UNSEND_WINDOW {
            return Err(CoreError::TooLate);
        }

        let updated = sqlx::query_as::<_, Message>(
            r#"update messages set unsent = true, unsent_at = $2
                  where id = $1
                  returning id, chat_id, sender_id, content, media_url, media_type,
                                      reply_to_message_id, client_message_id, sent_at, unsent,
                                      unsent_at, deleted_for_sender, deleted_for_all, is_read, is_edited"#,
        )
        .bind(message_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(CoreError::from_database_error)?;

        PgOutboxStore::insert_in_tx(
            &mut tx,
            routing_keys::CHAT_MESSAGE_UNSENT,
            "chat_server",
            serde_json::json!({"message_id": updated.id, "chat_id": updated.chat_id}),
        )
        .await
        .map_err(CoreError::from_database_error)?;

        tx.commit().await.map_err(CoreError::from_database_error)?;
        Ok(updated)
    }

    pub async fn soft_delete_for_sender(
        &self,
        message_id: MessageId,
        caller: UserId,
    ) -> Result<(), CoreError> {
        let result = sqlx::query(
            r#"update messages set deleted_for_sender = true where id = $1 and sender_id = $2"#,
        )
        .bind(message_id)
        .bind(caller)
        .execute(self.pool.as_ref())
        .await
        .map_err(CoreError::from_database_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("message {message_id} not found")));
        }
        Ok(())
    }

    /// For-all requires authorship.
    pub async fn soft_delete_for_all(
        &self,
        message_id: MessageId,
        caller: UserId,
    ) -> Result<Message, CoreError> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from_database_error)?;

        let updated = sqlx::query_as::<_, Message>(
            r#"update messages set deleted_for_all = true where id = $1 and sender_id = $2
                  returning id, chat_id, sender_id, content, media_url, media_type,
                                      reply_to_message_id, client_message_id, sent_at, unsent,
                                      unsent_at, deleted_for_sender, deleted_for_all, is_read, is_edited"#,
        )
        .bind(message_id)
        .bind(caller)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CoreError::from_database_error)?
        .ok_or(CoreError::Forbidden)?;

        PgOutboxStore::insert_in_tx(
            &mut tx,
            routing_keys::CHAT_MESSAGE_DELETED,
            "chat_server",
            serde_json::json!({"message_id": updated.id, "chat_id": updated.chat_id}),
        )
        .await
        .map_err(CoreError::from_database_error)?;

        tx.commit().await.map_err(CoreError::from_database_error)?;
        Ok(updated)
    }

    pub async fn mark_read(&self, message_id: MessageId) -> Result<(), CoreError> {
        sqlx::query(r#"update messages set is_read = true where id = $1"#)
            .bind(message_id)
            .execute(self.pool.as_ref())
            .await
            .map_err(CoreError::from_database_error)?;
        Ok(())
    }
}
