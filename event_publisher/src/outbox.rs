//! Outbox pattern flusher: the domain write and the outbox row share a
//! transaction, and a background task flushes undelivered rows to the
//! broker, so event emission can never diverge from the write it
//! describes.
//!
//! `chat_server` owns the `event_outbox` table and the `OutboxStore` impl
//! against it; this crate only knows the polling/retry loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::EventPublisher;

#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub id: Uuid,
    pub event_type: String,
    pub source: String,
    pub payload: Value,
}

#[async_trait]
pub trait OutboxStore: Send + Sync {
    async fn fetch_undelivered(&self, limit: i64) -> anyhow::Result<Vec<OutboxRow>>;
    async fn mark_delivered(&self, id: Uuid) -> anyhow::Result<()>;
}

/// Polls `store` and republishes anything still undelivered, marking rows
/// delivered as they succeed. Run as a background `tokio::spawn`ed task
/// alongside the binary's other long-running services.
pub struct OutboxFlusher<S: OutboxStore> {
    store: Arc<S>,
    publisher: Arc<dyn EventPublisher>,
    poll_interval: Duration,
}

impl<S: OutboxStore> OutboxFlusher<S> {
    pub fn new(store: Arc<S>, publisher: Arc<dyn EventPublisher>, poll_interval: Duration) -> Self {
        Self {
            store,
            publisher,
            poll_interval,
        }
    }

    pub async fn run(self) {
        loop {
            if let Err(e) = self.flush_once().await {
                warn!(error = %e, "outbox flush pass failed");
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn flush_once(&self) -> anyhow::Result<()> {
        let rows = self.store.fetch_undelivered(100).await?;
        for row in rows {
            match self
                .publisher
                .publish(&row.event_type, &row.source, row.payload.clone())
                .await
            {
                Ok(()) => {
                    self.store.mark_delivered(row.id).await?;
                    info!(event_id = %row.id, "outbox row flushed");
                }
                Err(e) => {
                    warn!(event_id = %row.id, error = %e, "outbox row still undeliverable, will retry next pass");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullEventPublisher;
    use std::sync::Mutex;

    struct FakeStore {
        rows: Mutex<Vec<OutboxRow>>,
        delivered: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl OutboxStore for FakeStore {
        async fn fetch_undelivered(&self, _limit: i64) -> anyhow::Result<Vec<OutboxRow>> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn mark_delivered(&self, id: Uuid) -> anyhow::Result<()> {
            self.rows.lock().unwrap().retain(|r| r.id != id);
            self.delivered.lock().unwrap().push(id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn flush_once_delivers_and_removes_rows() {
        let id = Uuid::now_v7();
        let store = Arc::new(FakeStore {
            rows: Mutex::new(vec![OutboxRow {
                id,
                event_type: "chat.message.sent".into(),
                source: "chat_server".into(),
                payload: Value::Null,
            }]),
            delivered: Mutex::new(vec![]),
        });
        let flusher = OutboxFlusher::new(
            store.clone(),
            Arc::new(NullEventPublisher),
            Duration::from_secs(1),
        );

        flusher.flush_once().await.unwrap();

        assert!(store.rows.lock().unwrap().is_empty());
        assert_eq!(store.delivered.lock().unwrap().len(), 1);
    }
}
