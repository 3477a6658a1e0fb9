//! Bearer/query-token extraction, grounded in
//! `fechatter_core::middlewares::{bearer_auth, query_token_auth}`.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chat_core::UserId;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser(pub UserId);

/// REST middleware: requires a bearer token in the `Authorization` header.
pub async fn require_bearer_auth(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut req: Request,
    next: Next,
) -> Response {
    match state.token_manager.verify_token(auth.token()) {
        Ok(claims) => {
            req.extensions_mut().insert(AuthenticatedUser(claims.user_id));
            next.run(req).await
        }
        Err(_) => (StatusCode::UNAUTHORIZED, "invalid or expired token").into_response(),
    }
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// Extracts and verifies a bearer token from either the `Authorization`
/// header or the `?token=` query parameter, for the WebSocket upgrade
/// handshake where not every client can set custom headers, grounded in
/// `query_token_auth`'s "designed for connections where headers cannot be
/// customized".
pub fn verify_ws_token(
    state: &AppState,
    auth_header: Option<&str>,
    query: &str,
) -> Result<UserId, StatusCode> {
    let token = if let Some(header) = auth_header {
        header.strip_prefix("Bearer ").unwrap_or(header).to_string()
    } else {
        serde_urlencoded::from_str::<TokenQuery>(query)
            .map_err(|_| StatusCode::UNAUTHORIZED)?
            .token
    };

    state
        .token_manager
        .verify_token(&token)
        .map(|claims| claims.user_id)
        .map_err(|_| StatusCode::UNAUTHORIZED)
}
