//! # Chat Server - Main Entry Point
//!
//! **Responsibility**: Initializes and runs the Axum web server, plus
//! the background tasks that keep the event fabric honest: the outbox
//! flusher and the notify bridge that pushes notification-worker
//! deliveries back into this process's chat hub.

use std::net::SocketAddr;
use std::time::Duration;

use chat_server::config::AppConfig;
use chat_server::{get_router, AppState};
use event_publisher::outbox::OutboxFlusher;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().expect("failed to load configuration");

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(&config.server.log_level))
        .init();

    let state = AppState::try_new(config.clone()).await?;

    tokio::spawn(OutboxFlusher::new(state.outbox.clone(), state.publisher.clone(), Duration::from_secs(2)).run());

    let bridge_hub = state.hub.clone();
    let nats_url = config.nats.url.clone();
    tokio::spawn(async move {
        if let Err(e) = chat_server::notify_bridge::run(&nats_url, bridge_hub).await {
            tracing::error!(error = %e, "notify bridge exited");
        }
    });

    let app = get_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("chat_server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
