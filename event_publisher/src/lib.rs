//! Event publisher: a library embedded into any service that needs to
//! emit domain events, grounded in
//! `fechatter_server::services::event_publisher::EventPublisher`.

pub mod nats;
pub mod outbox;

use async_trait::async_trait;
use chat_core::events::DomainEvent;
use serde_json::Value;
use tracing::{error, info, warn};

use nats::{NatsTransport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize event payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("transient broker failure: {0}")]
    Transient(String),
}

impl PublishError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Transient(_))
    }
}

impl From<TransportError> for PublishError {
    fn from(err: TransportError) -> Self {
        PublishError::Transient(err.to_string())
    }
}

/// Publish is synchronous w.r.t. broker ack: on transient failure the
/// caller receives an error and must decide whether to fall back to the
/// outbox.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        event_type: &str,
        source: &str,
        payload: Value,
    ) -> Result<(), PublishError>;
}

pub struct NatsEventPublisher {
    transport: NatsTransport,
}

impl NatsEventPublisher {
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            transport: NatsTransport::connect_with_retry(url).await?,
        })
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(
        &self,
        event_type: &str,
        source: &str,
        payload: Value,
    ) -> Result<(), PublishError> {
        let event = DomainEvent::new(event_type, source, payload);
        let body = serde_json::to_vec(&event)?;

        // NATS subjects already use `.` as the hierarchy separator, so the
        // routing key doubles as the wire subject with no translation layer.
        match self.transport.publish(event.event_type.clone(), body).await {
            Ok(()) => {
                info!(event_id = %event.event_id, r#type = %event.event_type, "published domain event");
                Ok(())
            }
            Err(e) => {
                warn!(event_id = %event.event_id, r#type = %event.event_type, error = %e, "event publish failed");
                Err(e.into())
            }
        }
    }
}

/// Test/no-op publisher used in unit tests so domain services don't need
/// a live broker connection.
pub struct NullEventPublisher;

#[async_trait]
impl EventPublisher for NullEventPublisher {
    async fn publish(
        &self,
        _event_type: &str,
        _source: &str,
        _payload: Value,
    ) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Always fails, for exercising outbox fallback paths in tests.
pub struct FailingEventPublisher;

#[async_trait]
impl EventPublisher for FailingEventPublisher {
    async fn publish(
        &self,
        _event_type: &str,
        _source: &str,
        _payload: Value,
    ) -> Result<(), PublishError> {
        error!("FailingEventPublisher always rejects publishes");
        Err(PublishError::Transient("broker unreachable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_publisher_always_succeeds() {
        let publisher = NullEventPublisher;
        let result = publisher
            .publish("chat.message.sent", "chat_server", serde_json::json!({}))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn failing_publisher_reports_transient() {
        let publisher = FailingEventPublisher;
        let err = publisher
            .publish("chat.message.sent", "chat_server", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
