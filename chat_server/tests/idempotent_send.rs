//! Resending the same `client_message_id` after a dropped ack must
//! return the original message rather than creating a duplicate.

mod common;

use chat_core::UserId;
use chat_server::domains::messaging::repository::NewMessage;
use common::TestDb;

#[tokio::test]
async fn duplicate_client_message_id_returns_the_original_message() {
        let db = TestDb::new().await;
        let chats = db.chat_repository();
        let messages = db.message_repository();

        let sender = UserId::new();
        let chat = chats
                .create_chat(sender, vec![sender, UserId::new()], None, false)
                .await
                .unwrap();

        let client_message_id = chat_core::ClientMessageId::new();
        let new_message = || NewMessage {
                content: "hello".into(),
                media_url: None,
                media_type: None,
                reply_to_message_id: None,
                client_message_id,
        };

        let first = messages.append_message(chat.id, sender, new_message()).await.expect("first send");
        let retry = messages.append_message(chat.id, sender, new_message()).await.expect("retried send");

        assert_eq!(first.id, retry.id);
        assert_eq!(first.sent_at, retry.sent_at);

        let count: (i64,) = sqlx::query_as("select count(*) from messages where client_message_id = $1")
                .bind(client_message_id)
                .fetch_one(db.pool.as_ref())
                .await
                .unwrap();
        assert_eq!(count.0, 1, "retrying with the same client_message_id must not insert a second row");
}

#[tokio::test]
async fn different_senders_may_reuse_the_same_client_message_id() {
        let db = TestDb::new().await;
        let chats = db.chat_repository();
        let messages = db.message_repository();

        let sender_a = UserId::new();
        let sender_b = UserId::new();
        let chat = chats
                .create_chat(sender_a, vec![sender_a, sender_b], None, false)
                .await
                .unwrap();

        let client_message_id = chat_core::ClientMessageId::new();
        let message_for = |sender| NewMessage {
                content: "hi".into(),
                media_url: None,
                media_type: None,
                reply_to_message_id: None,
                client_message_id,
        };

        let a = messages.append_message(chat.id, sender_a, message_for(sender_a)).await.expect("sender_a send");
        let b = messages.append_message(chat.id, sender_b, message_for(sender_b)).await.expect("sender_b send");
        assert_ne!(a.id, b.id, "the unique index is scoped to (sender_id, client_message_id)");
}
