//! Postgres-backed `OutboxStore`, grounded in the `event_outbox` table
//! declared by `migrations/0001_init.sql`.

use std::sync::Arc;

use async_trait::async_trait;
use event_publisher::outbox::{OutboxRow, OutboxStore};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgOutboxStore {
    pool: Arc<PgPool>,
}

impl PgOutboxStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Writes the outbox row in the caller's transaction, so it commits
    /// atomically with the domain mutation it describes.
    pub async fn insert_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        event_type: &str,
        source: &str,
        payload: serde_json::Value,
    ) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"insert into event_outbox (id, event_type, source, payload) values ($1, $2, $3, $4)"#,
        )
        .bind(id)
        .bind(event_type)
        .bind(source)
        .bind(payload)
        .execute(&mut **tx)
        .await?;
        Ok(id)
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn fetch_undelivered(&self, limit: i64) -> anyhow::Result<Vec<OutboxRow>> {
        let rows: Vec<(Uuid, String, String, serde_json::Value)> = sqlx::query_as(
            r#"select id, event_type, source, payload from event_outbox
                  where not delivered order by created_at asc limit $1"#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(
            rows
                .into_iter()
                .map(|(id, event_type, source, payload)| OutboxRow {
                    id,
                    event_type,
                    source,
                    payload,
                })
                .collect(),
        )
    }

    async fn mark_delivered(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"update event_outbox set delivered = true where id = $1"#)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
