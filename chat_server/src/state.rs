//! `AppState`, grounded in `fechatter_server::AppState` /
//! `notify_server::app_state::AppState`'s `Arc<Inner>` + `Deref` idiom.

use std::ops::Deref;
use std::sync::Arc;

use chat_core::{AuthConfig, TokenManager};
use event_publisher::{EventPublisher, NatsEventPublisher};
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::domains::chat::{ChatDomainServiceImpl, ChatRepository};
use crate::domains::messaging::{MessageDomainServiceImpl, MessageRepository};
use crate::domains::messaging::service::MessageConfig;
use crate::hub::ChatHub;
use crate::outbox_store::PgOutboxStore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub config: AppConfig,
    pub token_manager: TokenManager,
    pub hub: ChatHub,
    pub chat_service: Arc<ChatDomainServiceImpl>,
    pub message_service: Arc<MessageDomainServiceImpl>,
    pub outbox: Arc<PgOutboxStore>,
    pub publisher: Arc<dyn EventPublisher>,
}

impl Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AppState {
    pub async fn try_new(config: AppConfig) -> anyhow::Result<Self> {
        let pool = Arc::new(PgPool::connect(&config.server.db_url).await?);
        sqlx::migrate!("./migrations").run(pool.as_ref()).await?;

        let token_manager = TokenManager::from_config(&AuthConfig {
            pk: config.auth.pk.clone(),
        })
        .map_err(|e| anyhow::anyhow!("failed to initialize token manager: {e}"))?;

        let publisher: Arc<dyn EventPublisher> =
            Arc::new(NatsEventPublisher::connect(&config.nats.url).await?);

        let hub = ChatHub::new();
        let chat_repository = Arc::new(ChatRepository::new(pool.clone()));
        let message_repository = Arc::new(MessageRepository::new(pool.clone()));
        let outbox = Arc::new(PgOutboxStore::new(pool.clone()));

        let chat_service = Arc::new(ChatDomainServiceImpl::new(chat_repository.clone()));
        let message_service = Arc::new(MessageDomainServiceImpl::new(
            message_repository,
            chat_repository,
            hub.clone(),
            MessageConfig::default(),
        ));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                token_manager,
                hub,
                chat_service,
                message_service,
                outbox,
                publisher,
            }),
        })
    }
}
