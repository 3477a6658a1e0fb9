//! Bridges the notification worker (running in `notify_server`, a
//! separate process) back into this process's in-memory chat hub,
//! grounded in `notify_server::events::nats::NatsClient`'s
//! connect-and-subscribe idiom, reused here in the opposite direction:
//! a background subscriber that turns NATS pushes into local
//! `ChatHub::deliver_to_user` calls for whichever of this chat gateway's
//! sessions happen to belong to the recipient.

use futures::StreamExt;
use serde::Deserialize;

use crate::hub::ChatHub;

pub const PUSH_SUBJECT_WILDCARD: &str = "push.user.>";

#[derive(Debug, Deserialize)]
struct PushEnvelope {
    user_id: chat_core::UserId,
    kind: String,
    data: serde_json::Value,
}

/// Runs until the NATS connection is lost or the process shuts down.
/// Intended to be spawned once at startup and left running for the
/// lifetime of the server.
pub async fn run(nats_url: &str, hub: ChatHub) -> anyhow::Result<()> {
    let client = async_nats::connect(nats_url).await?;
    let mut subscriber = client.subscribe(PUSH_SUBJECT_WILDCARD).await?;

    tracing::info!(subject = PUSH_SUBJECT_WILDCARD, "notify bridge subscribed");

    while let Some(message) = subscriber.next().await {
        match serde_json::from_slice::<PushEnvelope>(&message.payload) {
            Ok(envelope) => {
                hub.deliver_to_user(envelope.user_id, &envelope.kind, envelope.data);
            }
            Err(e) => {
                tracing::warn!(error = %e, subject = %message.subject, "malformed push envelope, dropping");
            }
        }
    }

    Ok(())
}
