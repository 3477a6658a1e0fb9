//! REST handlers over chats/participants, grounded in
//! `fechatter_server::handlers::chat`'s `Extension<AuthUser>` +
//! `State<AppState>` pattern.

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chat_core::{Chat, ChatId, UserId};
use serde::Deserialize;
use validator::Validate;

use crate::domains::chat::ChatDomainService;
use crate::error::AppError;
use crate::middlewares::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChatRequest {
    pub is_group: bool,
    #[validate(length(max = 256))]
    pub name: Option<String>,
    pub participants: Vec<UserId>,
}

/// `POST /api/v1/chats`.
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Json(body): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<Chat>), AppError> {
    body
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let chat = state
        .chat_service
        .create_chat(caller, body.participants, body.name, body.is_group)
        .await
        .map_err(AppError::map_error)?;

    Ok((StatusCode::CREATED, Json(chat)))
}

/// `GET /api/v1/chats`.
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Chat>>, AppError> {
    let chats = state
        .chat_service
        .list_chats(caller)
        .await
        .map_err(AppError::map_error)?;
    Ok(Json(chats))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<Chat>, AppError> {
    let chat = state
        .chat_service
        .get_chat(chat_id, caller)
        .await
        .map_err(AppError::map_error)?;
    Ok(Json(chat))
}

pub async fn soft_delete_chat(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(chat_id): Path<ChatId>,
) -> Result<StatusCode, AppError> {
    state
        .chat_service
        .soft_delete_for_user(chat_id, caller)
        .await
        .map_err(AppError::map_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    pub user_id: UserId,
}

/// `POST /api/v1/chats/{id}/participants`: admin only, group chats only.
pub async fn add_participant(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path(chat_id): Path<ChatId>,
    Json(body): Json<AddParticipantRequest>,
) -> Result<StatusCode, AppError> {
    state
        .chat_service
        .add_participant(chat_id, caller, body.user_id)
        .await
        .map_err(AppError::map_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/v1/chats/{id}/participants/{user_id}`: admin only, `409`
/// if it would remove the last admin.
pub async fn remove_participant(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path((chat_id, target)): Path<(ChatId, UserId)>,
) -> Result<StatusCode, AppError> {
    state
        .chat_service
        .remove_participant(chat_id, caller, target)
        .await
        .map_err(AppError::map_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn promote_participant(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path((chat_id, target)): Path<(ChatId, UserId)>,
) -> Result<StatusCode, AppError> {
    state
        .chat_service
        .promote_participant(chat_id, caller, target)
        .await
        .map_err(AppError::map_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn demote_participant(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(caller)): Extension<AuthenticatedUser>,
    Path((chat_id, target)): Path<(ChatId, UserId)>,
) -> Result<StatusCode, AppError> {
    state
        .chat_service
        .demote_participant(chat_id, caller, target)
        .await
        .map_err(AppError::map_error)?;
    Ok(StatusCode::NO_CONTENT)
}
