//! The 60-second unsend window boundary.

mod common;

use chat_core::error::CoreError;
use chat_core::UserId;
use chrono::Duration;
use common::TestDb;

async fn send_one(repo: &chat_server::domains::messaging::MessageRepository, chat_id: chat_core::ChatId, sender: UserId) -> chat_core::Message {
        repo.append_message(
                chat_id,
                sender,
                chat_server::domains::messaging::repository::NewMessage {
                        content: "hi".into(),
                        media_url: None,
                        media_type: None,
                        reply_to_message_id: None,
                        client_message_id: chat_core::ClientMessageId::new(),
                },
        )
        .await
        .expect("append_message")
}

#[tokio::test]
async fn unsend_within_window_succeeds() {
        let db = TestDb::new().await;
        let chats = db.chat_repository();
        let messages = db.message_repository();

        let sender = UserId::new();
        let chat = chats
                .create_chat(sender, vec![sender, UserId::new()], None, false)
                .await
                .unwrap();
        let message = send_one(&messages, chat.id, sender).await;

        let now = message.sent_at + Duration::seconds(59);
        let unsent = messages.unsend_message(message.id, sender, now).await.expect("within window");
        assert!(unsent.unsent);
}

#[tokio::test]
async fn unsend_past_window_is_refused() {
        let db = TestDb::new().await;
        let chats = db.chat_repository();
        let messages = db.message_repository();

        let sender = UserId::new();
        let chat = chats
                .create_chat(sender, vec![sender, UserId::new()], None, false)
                .await
                .unwrap();
        let message = send_one(&messages, chat.id, sender).await;

        let now = message.sent_at + Duration::seconds(61);
        let err = messages
                .unsend_message(message.id, sender, now)
                .await
                .expect_err("past the 60s window must be refused");
        assert!(matches!(err, CoreError::TooLate));
}

#[tokio::test]
async fn unsend_by_a_non_sender_is_forbidden() {
        let db = TestDb::new().await;
        let chats = db.chat_repository();
        let messages = db.message_repository();

        let sender = UserId::new();
        let other = UserId::new();
        let chat = chats.create_chat(sender, vec![sender, other], None, false).await.unwrap();
        let message = send_one(&messages, chat.id, sender).await;

        let err = messages
                .unsend_message(message.id, other, message.sent_at)
                .await
                .expect_err("only the sender may unsend");
        assert!(matches!(err, CoreError::Forbidden));
}
