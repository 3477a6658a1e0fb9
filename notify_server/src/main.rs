//! # Notify Server - Main Entry Point
//!
//! **Responsibility**: declares the event broker topology and runs the
//! notification worker as a background task, alongside a small Axum app
//! that exposes only `/health`.

use std::net::SocketAddr;
use std::sync::Arc;

use notify_server::config::AppConfig;
use notify_server::events::{EventBroker, EventProcessor};
use notify_server::notifications::NotificationRepository;
use notify_server::{get_router, AppState};
use sqlx::PgPool;
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

    let pool = Arc::new(PgPool::connect(&config.server.db_url).await?);
    sqlx::migrate!("./migrations").run(pool.as_ref()).await?;

    let broker = Arc::new(EventBroker::connect(&config.nats.url).await?);
    let push_client = async_nats::connect(&config.nats.url).await?;
    let notifications = Arc::new(NotificationRepository::new(pool.clone()));

    let processor = EventProcessor::new(
        broker,
        push_client,
        pool.clone(),
        notifications,
        config.dedup.lru_capacity,
    )
    .await?;

    tokio::spawn(async move {
        if let Err(e) = processor.run().await {
            tracing::error!(error = %e, "notification worker exited");
        }
    });

    let state = AppState::new(config.clone(), pool);
    let app = get_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("notify_server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
