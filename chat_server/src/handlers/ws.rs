//! The WebSocket upgrade handshake, reader pump and writer pump, grounded
//! in `notify_server::sse::sse_handler`'s connect/subscribe shape,
//! generalized from SSE's one-way broadcast channel to a bidirectional
//! `axum::extract::ws` socket so it can also accept incoming frames
//! (text/media/typing/read_receipt/pong).

use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chat_core::{ChatId, MediaType, MessageId};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{interval, sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domains::chat::ChatDomainService;
use crate::domains::messaging::{MessageDomainService, SendMessageInput};
use crate::hub::{ChatHub, SessionId};
use crate::middlewares::rate_limit::TokenBucket;
use crate::middlewares::verify_ws_token;
use crate::state::AppState;

/// WebSocket close codes.
mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const POLICY_VIOLATION: u16 = 4008;
    pub const UNAUTHENTICATED: u16 = 4401;
    pub const FORBIDDEN: u16 = 4403;
    pub const NOT_FOUND: u16 = 4404;
}

const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Offenses (oversized frame, rate limit) tolerated before the connection
/// is closed with 4008; offenders get an error frame first, and the
/// connection is only closed on repeated violation.
const MAX_VIOLATIONS: u32 = 3;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Text {
        content: String,
        reply_to_message_id: Option<MessageId>,
        #[serde(default = "Uuid::now_v7")]
        client_message_id: Uuid,
    },
    Media {
        media_url: String,
        media_type: MediaType,
        #[serde(default)]
        content: String,
        reply_to_message_id: Option<MessageId>,
        #[serde(default = "Uuid::now_v7")]
        client_message_id: Uuid,
    },
    Typing,
    ReadReceipt {
        message_id: MessageId,
    },
    Pong,
}

/// `GET /api/v1/chats/{chat_id}/ws`. Performs the full handshake, token
/// verification then membership check, before upgrading, so a rejected
/// caller never even establishes a WebSocket.
pub async fn chat_ws_handler(
    State(state): State<AppState>,
    Path(chat_id): Path<ChatId>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
    uri: axum::http::Uri,
) -> Response {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let query = uri.query().unwrap_or("");

    let user_id = match verify_ws_token(&state, auth_header, query) {
        Ok(user_id) => user_id,
        Err(_) => return (StatusCode::UNAUTHORIZED, "invalid or missing token").into_response(),
    };

    match state.chat_service.role_of(chat_id, user_id).await {
        Ok(role) if role.can_read() => {}
        Ok(_) => return (StatusCode::FORBIDDEN, "not a participant").into_response(),
        Err(chat_core::error::CoreError::NotFound(_)) => {
            return (StatusCode::NOT_FOUND, "chat not found").into_response()
        }
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, chat_id, user_id))
}

/// Ensures `ChatHub::unregister` runs exactly once regardless of which
/// exit path the socket takes.
struct SessionGuard {
    hub: ChatHub,
    chat_id: ChatId,
    user_id: chat_core::UserId,
    session_id: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.hub.unregister(self.chat_id, self.user_id, self.session_id);
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, chat_id: ChatId, user_id: chat_core::UserId) {
    let (session_id, mut outbound_rx) = state.hub.register(chat_id, user_id);
    let _guard = SessionGuard {
        hub: state.hub.clone(),
        chat_id,
        user_id,
        session_id,
    };

    let (mut sink, mut stream) = socket.split();

    let hello = serde_json::json!({
        "type": "hello",
        "chat_id": chat_id,
        "user_id": user_id,
        "session_id": session_id,
    });
    if sink.send(WsMessage::Text(hello.to_string().into())).await.is_err() {
        return;
    }

    let rate_limit_cfg = &state.config.rate_limit;
    let mut bucket = TokenBucket::new(rate_limit_cfg.frames_per_second, rate_limit_cfg.burst);
    let max_frame_bytes = rate_limit_cfg.max_frame_bytes;

    let mut ping_ticker = interval(PING_INTERVAL);
    let mut awaiting_pong = false;
    let mut pong_deadline = Instant::now() + PING_INTERVAL + PONG_TIMEOUT;
    let mut violations: u32 = 0;

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(frame) => {
                        let text = match serde_json::to_string(&frame) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(error = %e, "failed to serialize outbound frame");
                                continue;
                            }
                        };
                        if sink.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = ping_ticker.tick() => {
                let ping = serde_json::json!({"type": "ping", "data": {}});
                if sink.send(WsMessage::Text(ping.to_string().into())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
                pong_deadline = Instant::now() + PONG_TIMEOUT;
            }

            _ = sleep_until(pong_deadline), if awaiting_pong => {
                info!(%chat_id, %user_id, "no pong within heartbeat window, closing");
                let _ = sink.send(WsMessage::Close(Some(axum::extract::ws::CloseFrame {
                    code: close_code::NORMAL,
                    reason: "heartbeat timeout".into(),
                }))).await;
                break;
            }

            incoming = stream.next() => {
                let Some(incoming) = incoming else { break };
                let incoming = match incoming {
                    Ok(msg) => msg,
                    Err(e) => {
                        debug!(error = %e, "websocket read error");
                        break;
                    }
                };

                match incoming {
                    WsMessage::Pong(_) => {}
                    WsMessage::Ping(payload) => {
                        if sink.send(WsMessage::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    WsMessage::Close(_) => break,
                    WsMessage::Text(text) => {
                        if text.len() > max_frame_bytes {
                            if record_violation(&mut sink, &mut violations, "frame too large").await {
                                break;
                            }
                            continue;
                        }
                        if !bucket.try_consume() {
                            if record_violation(&mut sink, &mut violations, "rate limit exceeded").await {
                                break;
                            }
                            continue;
                        }
                        handle_client_frame(&state, chat_id, user_id, session_id, &text, &mut awaiting_pong).await;
                    }
                    WsMessage::Binary(data) => {
                        if data.len() > max_frame_bytes {
                            if record_violation(&mut sink, &mut violations, "frame too large").await {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Sends a JSON error frame for the first `MAX_VIOLATIONS - 1` offenses;
/// past that it closes the socket with 4008 and returns `true` so the
/// caller knows to stop reading.
async fn record_violation(
    sink: &mut futures::stream::SplitSink<WebSocket, WsMessage>,
    violations: &mut u32,
    reason: &'static str,
) -> bool {
    *violations += 1;
    if *violations >= MAX_VIOLATIONS {
        close_with(sink, close_code::POLICY_VIOLATION, reason).await;
        true
    } else {
        let error = serde_json::json!({"type": "error", "data": {"code": "policy_violation", "message": reason}});
        let _ = sink.send(WsMessage::Text(error.to_string().into())).await;
        false
    }
}

async fn close_with(
    sink: &mut futures::stream::SplitSink<WebSocket, WsMessage>,
    code: u16,
    reason: &'static str,
) {
    let _ = sink
        .send(WsMessage::Close(Some(axum::extract::ws::CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

async fn handle_client_frame(
    state: &AppState,
    chat_id: ChatId,
    user_id: chat_core::UserId,
    session_id: SessionId,
    text: &str,
    awaiting_pong: &mut bool,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, "malformed client frame, ignoring");
            return;
        }
    };

    match frame {
        ClientFrame::Text {
            content,
            reply_to_message_id,
            client_message_id,
        } => {
            send_message(
                state,
                chat_id,
                user_id,
                session_id,
                SendMessageInput {
                    content,
                    media_url: None,
                    media_type: None,
                    reply_to_message_id,
                    client_message_id,
                },
            )
            .await;
        }
        ClientFrame::Media {
            media_url,
            media_type,
            content,
            reply_to_message_id,
            client_message_id,
        } => {
            send_message(
                state,
                chat_id,
                user_id,
                session_id,
                SendMessageInput {
                    content,
                    media_url: Some(media_url),
                    media_type: Some(media_type),
                    reply_to_message_id,
                    client_message_id,
                },
            )
            .await;
        }
        ClientFrame::Typing => {
            state.hub.broadcast(
                chat_id,
                "typing",
                serde_json::json!({"user_id": user_id}),
                Some(session_id),
            );
        }
        ClientFrame::ReadReceipt { message_id } => {
            let _ = state.message_service.mark_read(message_id, chat_id, user_id).await;
        }
        ClientFrame::Pong => {
            *awaiting_pong = false;
        }
    }
}

async fn send_message(
    state: &AppState,
    chat_id: ChatId,
    user_id: chat_core::UserId,
    session_id: SessionId,
    input: SendMessageInput,
) {
    let result = state
        .message_service
        .send_message(chat_id, user_id, input, Some(session_id))
        .await;
    if let Err(e) = result {
        state.hub.deliver_to_user(
            user_id,
            "error",
            serde_json::json!({"code": e.code(), "message": e.to_string()}),
        );
    }
}
