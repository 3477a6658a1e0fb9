//! The `notifications` table: the persistence fallback a recipient's
//! client can query on reconnect, sized to just the one operation the
//! notification worker needs, grounded in `chat_server::outbox_store`'s
//! single-purpose repository shape.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

pub struct NotificationRepository {
    pool: Arc<PgPool>,
}

impl NotificationRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Records that `recipient_id` was notified of `event_id`. Idempotent
    /// under redelivery via `(event_id, recipient_id)`'s unique index: a
    /// second insert for the same pair is silently absorbed rather than
    /// erroring, since the in-memory LRU dedup is the primary guard and
    /// this index only backstops a worker restart.
    pub async fn persist(
        &self,
        recipient_id: chat_core::UserId,
        event_id: Uuid,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"insert into notifications (id, recipient_id, event_id, event_type, payload)
                  values ($1, $2, $3, $4, $5)
                  on conflict (event_id, recipient_id) do nothing"#,
        )
        .bind(Uuid::now_v7())
        .bind(recipient_id)
        .bind(event_id)
        .bind(event_type)
        .bind(payload)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }
}
