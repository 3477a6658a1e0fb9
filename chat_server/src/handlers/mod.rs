//! HTTP/WS surface, grounded in `notify_server::get_router`'s
//! layered-route-group pattern: public routes, then header-authenticated
//! REST routes, then the query-token-authenticated WebSocket route.

pub mod chat;
pub mod health;
pub mod messages;
pub mod ws;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post};
use axum::Router;

use crate::middlewares::{request_id_middleware, require_bearer_auth};
use crate::state::AppState;

pub fn get_router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        .route("/chats", post(chat::create_chat).get(chat::list_chats))
        .route("/chats/{chat_id}", get(chat::get_chat).delete(chat::soft_delete_chat))
        .route("/chats/{chat_id}/participants", post(chat::add_participant))
        .route(
            "/chats/{chat_id}/participants/{user_id}",
            delete(chat::remove_participant),
        )
        .route(
            "/chats/{chat_id}/participants/{user_id}/promote",
            post(chat::promote_participant),
        )
        .route(
            "/chats/{chat_id}/participants/{user_id}/demote",
            post(chat::demote_participant),
        )
        .route(
            "/chats/{chat_id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route(
            "/messages/{message_id}",
            delete(messages::unsend_message),
        )
        .route(
            "/messages/{message_id}/delete_for_all",
            post(messages::delete_message_for_all),
        )
        .route(
            "/messages/{message_id}/delete_for_sender",
            post(messages::delete_message_for_sender),
        )
        .layer(from_fn_with_state(state.clone(), require_bearer_auth));

    // The WebSocket upgrade route authenticates itself inside
    // `ws::chat_ws_handler` (bearer header or `?token=` query param), since
    // not every client can set a header on the upgrade request.
    let ws_routes = Router::new().route("/chats/{chat_id}/ws", get(ws::chat_ws_handler));

    let public_routes = Router::new().route("/health", get(health::health_check));

    Router::new()
        .nest(
            "/api/v1",
            Router::new().merge(authenticated_routes).merge(ws_routes),
        )
        .merge(public_routes)
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
