//! REST handlers over messages, grounded in
//! `fechatter_server::handlers::messages`.

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chat_core::{ChatId, MediaType, Message, MessageCursor, MessageId};
use serde::Deserialize;
use uuid::Uuid;

use crate::domains::messaging::{MessageDomainService, SendMessageInput};
use crate::error::AppError;
use crate::middlewares::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListMessagesParams {
    pub before_sent_at: Option<chrono::DateTime<chrono::Utc>>,
    pub before_message_id: Option<MessageId>,
    pub limit: Option<u32>,
}

/// `GET /api/v1/chats/{id}/messages?before=<cursor>&limit=<n≤100>`.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(chat_id): Path<ChatId>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<Vec<Message>>, AppError> {
    let before = match (params.before_sent_at, params.before_message_id) {
        (Some(sent_at), Some(message_id)) => Some(MessageCursor { sent_at, message_id }),
        _ => None,
    };

    let messages = state
        .message_service
        .list_messages(chat_id, caller, before, params.limit.unwrap_or(50))
        .await
        .map_err(AppError::map_error)?;

    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
    pub reply_to_message_id: Option<MessageId>,
    #[serde(default = "Uuid::now_v7")]
    pub client_message_id: Uuid,
}

/// REST fallback for sending a message outside an open WebSocket
/// connection. The WebSocket reader pump is the primary path; this handler
/// shares the same `MessageDomainService::send_message` call so both paths
/// honor identical validation/idempotence/broadcast semantics.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(chat_id): Path<ChatId>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = state
        .message_service
        .send_message(
            chat_id,
            caller,
            SendMessageInput {
                content: body.content,
                media_url: body.media_url,
                media_type: body.media_type,
                reply_to_message_id: body.reply_to_message_id,
                client_message_id: body.client_message_id,
            },
            None,
        )
        .await
        .map_err(AppError::map_error)?;

    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
pub struct UnsendQuery {
    pub chat_id: ChatId,
}

/// `DELETE /api/v1/messages/{id}?chat_id=<id>`: unsend within 60s,
/// `409 too_late` otherwise.
pub async fn unsend_message(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(message_id): Path<MessageId>,
    Query(_params): Query<UnsendQuery>,
) -> Result<Json<Message>, AppError> {
    let message = state
        .message_service
        .unsend_message(message_id, caller)
        .await
        .map_err(AppError::map_error)?;
    Ok(Json(message))
}

pub async fn delete_message_for_all(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(message_id): Path<MessageId>,
) -> Result<Json<Message>, AppError> {
    let message = state
        .message_service
        .delete_for_all(message_id, caller)
        .await
        .map_err(AppError::map_error)?;
    Ok(Json(message))
}

pub async fn delete_message_for_sender(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(message_id): Path<MessageId>,
) -> Result<StatusCode, AppError> {
    state
        .message_service
        .delete_for_sender(message_id, caller)
        .await
        .map_err(AppError::map_error)?;
    Ok(StatusCode::NO_CONTENT)
}
