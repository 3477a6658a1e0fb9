//! The notification worker, grounded in
//! `notify_server::events::processor::EventProcessor`'s subject-routing
//! `match`, generalized to parse `DomainEvent` envelopes and resolve a
//! recipient set per event type instead of routing ad hoc JSON.

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_nats::jetstream::consumer::PullConsumer;
use chat_core::events::DomainEvent;
use chat_core::UserId;
use futures::StreamExt;
use lru::LruCache;
use parking_lot::Mutex;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::broker::{EventBroker, MAX_DELIVER};
use crate::notifications::NotificationRepository;

/// NATS subject prefix `chat_server::notify_bridge` subscribes on to
/// forward pushes into its in-process `ChatHub`.
const PUSH_SUBJECT_PREFIX: &str = "push.user";

pub struct EventProcessor {
    consumer: PullConsumer,
    broker: Arc<EventBroker>,
    push_client: async_nats::Client,
    pool: Arc<PgPool>,
    notifications: Arc<NotificationRepository>,
    dedup: Mutex<LruCache<Uuid, ()>>,
}

impl EventProcessor {
    pub async fn new(
        broker: Arc<EventBroker>,
        push_client: async_nats::Client,
        pool: Arc<PgPool>,
        notifications: Arc<NotificationRepository>,
        dedup_capacity: usize,
    ) -> anyhow::Result<Self> {
        let consumer = broker.notification_events_consumer().await?;
        let capacity = NonZeroUsize::new(dedup_capacity).unwrap_or(NonZeroUsize::new(100_000).unwrap());

        Ok(Self {
            consumer,
            broker,
            push_client,
            pool,
            notifications,
            dedup: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Runs forever, pulling batches of up to 16 messages from
    /// `notification_events`.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("notification worker started, consuming notification_events");
        loop {
            let mut messages = self.consumer.fetch().max_messages(16).messages().await?;
            while let Some(message) = messages.next().await {
                let message = match message {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(error = %e, "failed to pull message from notification_events");
                        continue;
                    }
                };

                let num_delivered = message.info().map(|i| i.delivered).unwrap_or(1);
                match self.process_one(&message.payload).await {
                    Ok(()) => {
                        if let Err(e) = message.ack().await {
                            warn!(error = %e, "failed to ack notification_events message");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, delivered = num_delivered, "notification_events handler failed");
                        if num_delivered >= MAX_DELIVER as u64 {
                            if let Err(dlq_err) = self
                                .broker
                                .dead_letter(message.subject.as_str(), message.payload.to_vec())
                                .await
                            {
                                error!(error = %dlq_err, "failed to route exhausted message to DLQ");
                            }
                            let _ = message.ack().await;
                        }
                        // otherwise leave it un-acked so JetStream redelivers.
                    }
                }
            }
        }
    }

    async fn process_one(&self, payload: &[u8]) -> anyhow::Result<()> {
        let event: DomainEvent = serde_json::from_slice(payload)?;

        if self.already_seen(event.event_id) {
            debug!(event_id = %event.event_id, "duplicate delivery, skipped by dedup LRU");
            return Ok(());
        }

        let recipients = self.resolve_recipients(&event).await?;
        for recipient in recipients {
            self.notify_recipient(&event, recipient).await?;
        }

        Ok(())
    }

    /// Dedup using `event_id`, a bounded in-memory LRU.
    fn already_seen(&self, event_id: Uuid) -> bool {
        let mut cache = self.dedup.lock();
        if cache.contains(&event_id) {
            true
        } else {
            cache.put(event_id, ());
            false
        }
    }

    /// Looks up the recipient set per event type. `chat.message.sent`
    /// resolves to the chat's participants minus the sender;
    /// `*.liked`/`*.followed`/`*.mentioned` belong to the thread and
    /// community subsystems this workspace doesn't implement, so no
    /// producer in this workspace ever emits them; the binding exists for
    /// topology completeness only.
    async fn resolve_recipients(&self, event: &DomainEvent) -> anyhow::Result<Vec<UserId>> {
        match event.event_type.as_str() {
            "chat.message.sent" => {
                let chat_id: Uuid = event
                    .payload
                    .get("chat_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| anyhow::anyhow!("chat.message.sent event missing chat_id"))?;
                let sender_id: Uuid = event
                    .payload
                    .get("sender_id")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| anyhow::anyhow!("chat.message.sent event missing sender_id"))?;

                let rows: Vec<(Uuid,)> =
                    sqlx::query_as(r#"select user_id from participants where chat_id = $1 and user_id <> $2"#)
                        .bind(chat_id)
                        .bind(sender_id)
                        .fetch_all(self.pool.as_ref())
                        .await?;

                Ok(rows.into_iter().map(|(id,)| UserId::from(id)).collect())
            }
            other if other.ends_with(".liked") || other.ends_with(".followed") || other.ends_with(".mentioned") => {
                warn!(event_type = other, "recipient resolution not implemented for out-of-scope event type");
                Ok(Vec::new())
            }
            other => {
                warn!(event_type = other, "unrecognized event type on notification_events, no recipients resolved");
                Ok(Vec::new())
            }
        }
    }

    /// Pushes a notification frame to a live session via the
    /// `chat_server` bridge and persists a fallback row unconditionally.
    /// This worker runs in a separate process from the chat gateway by
    /// design, so it cannot observe session liveness directly; persisting
    /// unconditionally makes the fallback correct regardless, at the cost
    /// of a notifications row that a live push also delivered.
    async fn notify_recipient(&self, event: &DomainEvent, recipient: UserId) -> anyhow::Result<()> {
        self
            .notifications
            .persist(recipient, event.event_id, &event.event_type, event.payload.clone())
            .await?;

        let subject = format!("{PUSH_SUBJECT_PREFIX}.{recipient}");
        let envelope = serde_json::json!({
            "user_id": recipient,
            "kind": "notification",
            "data": {
                "event_id": event.event_id,
                "event_type": event.event_type,
                "payload": event.payload,
            },
        });
        self
            .push_client
            .publish(subject, serde_json::to_vec(&envelope)?.into())
            .await?;

        Ok(())
    }
}
