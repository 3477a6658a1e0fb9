//! Thin NATS connection wrapper, grounded directly in
//! `notify_server::events::nats::NatsClient`'s connect-with-retry idiom.

use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("nats connect failed: {0}")]
    Connect(#[from] async_nats::ConnectError),
    #[error("nats publish failed: {0}")]
    Publish(#[from] async_nats::PublishError),
}

pub struct NatsTransport {
    client: async_nats::Client,
}

impl NatsTransport {
    pub async fn connect_with_retry(url: &str) -> Result<Self, TransportError> {
        const MAX_RETRIES: u32 = 5;
        let mut retries = 0;

        loop {
            let connect_options = async_nats::ConnectOptions::new()
                .connection_timeout(std::time::Duration::from_secs(10))
                .ping_interval(std::time::Duration::from_secs(30))
                .max_reconnects(Some(10))
                .reconnect_delay_callback(|attempts: usize| {
                    std::time::Duration::from_secs(std::cmp::min(2u64.saturating_pow(attempts as u32), 30))
                });

            info!("connecting to NATS at {}", url);
            match connect_options.connect(url).await {
                Ok(client) => {
                    info!("connected to NATS at {}", url);
                    return Ok(Self { client });
                }
                Err(e) => {
                    retries += 1;
                    if retries >= MAX_RETRIES {
                        error!("failed to connect to NATS after {} retries: {}", MAX_RETRIES, e);
                        return Err(e.into());
                    }
                    let backoff = std::time::Duration::from_secs(2u64.saturating_pow(retries));
                    warn!(
                        "NATS connect attempt {}/{} failed: {}, retrying in {:?}",
                        retries, MAX_RETRIES, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    pub async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client.publish(subject, payload.into()).await?;
        Ok(())
    }
}
