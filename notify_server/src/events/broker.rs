//! Event broker topology. The AMQP-flavored vocabulary (exchange, queue,
//! binding, DLQ) this workspace talks about is realized on NATS
//! JetStream, grounded in `event_publisher::nats::NatsTransport`'s
//! connect-with-retry idiom, generalized from a plain publish connection
//! to a topology-declaring JetStream context.

use async_nats::jetstream::{self, consumer::pull, stream};
use tracing::{info, warn};

/// Stands in for the durable topic exchange `events`: one stream rooted
/// at every subject prefix this system's producers publish under.
pub const EVENTS_STREAM: &str = "EVENTS";
pub const EVENTS_STREAM_SUBJECTS: &[&str] = &["chat.>", "user.>", "thread.>"];

/// Stands in for the dead-letter exchange.
pub const DLQ_STREAM: &str = "EVENTS_DLQ";
pub const DLQ_STREAM_SUBJECT: &str = "events.dlq";

/// Per-message retry budget before a message is negatively acknowledged
/// without requeue and routed to the DLQ instead.
pub const MAX_DELIVER: i64 = 3;
/// JetStream's analogue of AMQP `prefetch`.
pub const MAX_ACK_PENDING: i64 = 16;

pub struct QueueBinding {
    pub durable_name: &'static str,
    pub filter_subjects: &'static [&'static str],
}

/// The four named queues this topology declares, with their bindings.
/// Only `notification_events` has a live consumer in this binary; the
/// other three are declared for topology completeness, matching the
/// teacher's habit of declaring bindings a future consumer will use.
pub const QUEUE_BINDINGS: &[QueueBinding] = &[
    QueueBinding {
        durable_name: "user_events",
        filter_subjects: &["user.*"],
    },
    QueueBinding {
        durable_name: "thread_events",
        filter_subjects: &["thread.*"],
    },
    QueueBinding {
        durable_name: "chat_events",
        filter_subjects: &["chat.*"],
    },
    QueueBinding {
        durable_name: "notification_events",
        filter_subjects: &["*.liked", "*.followed", "*.mentioned", "chat.message.sent"],
    },
];

pub struct EventBroker {
    jetstream: jetstream::Context,
    events_stream: stream::Stream,
}

impl EventBroker {
    /// Connects and declares the full topology idempotently at startup.
    pub async fn connect(nats_url: &str) -> anyhow::Result<Self> {
        let client = async_nats::connect(nats_url).await?;
        let jetstream = jetstream::new(client);

        jetstream
            .get_or_create_stream(stream::Config {
                name: DLQ_STREAM.to_string(),
                subjects: vec![DLQ_STREAM_SUBJECT.to_string()],
                ..Default::default()
            })
            .await?;

        let events_stream = jetstream
            .get_or_create_stream(stream::Config {
                name: EVENTS_STREAM.to_string(),
                subjects: EVENTS_STREAM_SUBJECTS.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            })
            .await?;

        for binding in QUEUE_BINDINGS {
            events_stream
                .get_or_create_consumer(
                    binding.durable_name,
                    pull::Config {
                        durable_name: Some(binding.durable_name.to_string()),
                        filter_subjects: binding.filter_subjects.iter().map(|s| s.to_string()).collect(),
                        max_deliver: MAX_DELIVER,
                        max_ack_pending: MAX_ACK_PENDING,
                        ack_policy: jetstream::consumer::AckPolicy::Explicit,
                        ..Default::default()
                    },
                )
                .await?;
            info!(queue = binding.durable_name, "declared durable consumer");
        }

        info!("event broker topology declared");
        Ok(Self { jetstream, events_stream })
    }

    /// The only queue this binary actually drains.
    pub async fn notification_events_consumer(&self) -> anyhow::Result<jetstream::consumer::PullConsumer> {
        Ok(self.events_stream.get_consumer("notification_events").await?)
    }

    /// Publishes `payload` onto the DLQ stream once a message's retry
    /// budget (3) is spent.
    pub async fn dead_letter(&self, original_subject: &str, payload: Vec<u8>) -> anyhow::Result<()> {
        self.jetstream.publish(DLQ_STREAM_SUBJECT, payload.into()).await?.await?;
        warn!(subject = original_subject, "message routed to DLQ after exhausting retry budget");
        Ok(())
    }
}
