pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{require_bearer_auth, verify_ws_token, AuthenticatedUser};
pub use request_id::request_id_middleware;
