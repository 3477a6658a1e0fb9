pub mod config;
pub mod domains;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod middlewares;
pub mod notify_bridge;
pub mod outbox_store;
pub mod state;

pub use config::AppConfig;
pub use error::AppError;
pub use handlers::get_router;
pub use state::AppState;
