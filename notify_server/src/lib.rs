pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod notifications;
pub mod state;

pub use config::AppConfig;
pub use error::NotifyError;
pub use handlers::get_router;
pub use state::AppState;
