//! `AppState`, grounded in `notify_server::state::app_state::AppState`'s
//! `Arc<Inner>` + `Deref` idiom. Trimmed to what this binary's own HTTP
//! surface (just `/health`) needs; the event-processing pipeline owns its
//! own handles, wired up in `main.rs`.

use std::ops::Deref;
use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub config: AppConfig,
    pub pool: Arc<PgPool>,
}

impl Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AppState {
    pub fn new(config: AppConfig, pool: Arc<PgPool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pool }),
        }
    }
}
