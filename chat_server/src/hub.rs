//! The process-local registry of live WebSocket sessions, grounded in
//! `notify_server::connections::manager::ConnectionManager`, generalized
//! from broadcast channels to per-session bounded `mpsc` queues so a
//! saturated session can be detected and dropped without affecting
//! broadcast to anyone else.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chat_core::{ChatId, UserId};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Capacity of a session's bounded outbound queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub type SessionId = Uuid;

/// A server-produced frame destined for one session's writer pump.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    pub seq: Option<u64>,
    pub data: serde_json::Value,
}

#[derive(Clone)]
struct Session {
    user_id: UserId,
    sender: mpsc::Sender<Frame>,
}

/// Process-local chat fan-out registry. Strictly in-memory: on process
/// restart every session reconnects and re-registers.
#[derive(Clone)]
pub struct ChatHub {
    inner: Arc<ChatHubInner>,
}

struct ChatHubInner {
    sessions_by_chat: DashMap<ChatId, HashSet<SessionId>>,
    sessions_by_user: DashMap<UserId, HashSet<SessionId>>,
    sessions: DashMap<SessionId, Session>,
    sequence_by_chat: DashMap<ChatId, AtomicU64>,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChatHubInner {
                sessions_by_chat: DashMap::new(),
                sessions_by_user: DashMap::new(),
                sessions: DashMap::new(),
                sequence_by_chat: DashMap::new(),
            }),
        }
    }

    /// Register a session and hand back the bounded receiver its writer
    /// pump should drain. Idempotent under repeat registration of the same
    /// session id.
    pub fn register(&self, chat_id: ChatId, user_id: UserId) -> (SessionId, mpsc::Receiver<Frame>) {
        let session_id = Uuid::now_v7();
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

        self.inner.sessions.insert(
            session_id,
            Session {
                user_id,
                sender: tx,
            },
        );
        self
            .inner
            .sessions_by_chat
            .entry(chat_id)
            .or_default()
            .insert(session_id);
        self
            .inner
            .sessions_by_user
            .entry(user_id)
            .or_default()
            .insert(session_id);

        debug!(%chat_id, %user_id, %session_id, "session registered");
        (session_id, rx)
    }

    /// Deregister a session from every map it appears in. Called exactly
    /// once per session, from the `SessionGuard` drop path.
    pub fn unregister(&self, chat_id: ChatId, user_id: UserId, session_id: SessionId) {
        self.inner.sessions.remove(&session_id);
        if let Some(mut set) = self.inner.sessions_by_chat.get_mut(&chat_id) {
            set.remove(&session_id);
        }
        if let Some(mut set) = self.inner.sessions_by_user.get_mut(&user_id) {
            set.remove(&session_id);
        }
        debug!(%chat_id, %user_id, %session_id, "session deregistered");
    }

    fn next_seq(&self, chat_id: ChatId) -> u64 {
        self
            .inner
            .sequence_by_chat
            .entry(chat_id)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
    }

    /// Non-blocking fan-out: pushes `frame` to every session subscribed to
    /// `chat_id` except `exclude`. A full queue marks that session stale
    /// and it is dropped from the hub; no other session is affected.
    pub fn broadcast(&self, chat_id: ChatId, kind: &str, data: serde_json::Value, exclude: Option<SessionId>) {
        let seq = self.next_seq(chat_id);
        let frame = Frame {
            kind: kind.to_string(),
            seq: Some(seq),
            data,
        };

        let Some(session_ids) = self.inner.sessions_by_chat.get(&chat_id).map(|s| s.clone()) else {
            return;
        };

        let mut stale = Vec::new();
        for session_id in session_ids {
            if Some(session_id) == exclude {
                continue;
            }
            let Some(session) = self.inner.sessions.get(&session_id).map(|s| s.clone()) else {
                continue;
            };
            if session.sender.try_send(frame.clone()).is_err() {
                warn!(%chat_id, %session_id, "outbound queue saturated, closing slow consumer");
                stale.push((session.user_id, session_id));
            }
        }

        for (user_id, session_id) in stale {
            self.unregister(chat_id, user_id, session_id);
        }
    }

    /// Iterates sessions for `user_id` across every chat, used by the
    /// notification worker bridge to push to a specific recipient.
    pub fn deliver_to_user(&self, user_id: UserId, kind: &str, data: serde_json::Value) {
        let frame = Frame {
            kind: kind.to_string(),
            seq: None,
            data,
        };

        let Some(session_ids) = self.inner.sessions_by_user.get(&user_id).map(|s| s.clone()) else {
            return;
        };

        for session_id in session_ids {
            if let Some(session) = self.inner.sessions.get(&session_id) {
                if session.sender.try_send(frame.clone()).is_err() {
                    warn!(%user_id, %session_id, "deliver_to_user queue saturated, dropping frame");
                }
            }
        }
    }

    pub fn count(&self, chat_id: ChatId) -> usize {
        self
            .inner
            .sessions_by_chat
            .get(&chat_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_broadcast_delivers_frame() {
        let hub = ChatHub::new();
        let chat_id = ChatId::new();
        let user_id = UserId::new();
        let (_session_id, mut rx) = hub.register(chat_id, user_id);

        hub.broadcast(chat_id, "message.new", serde_json::json!({"x": 1}), None);

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.kind, "message.new");
        assert_eq!(frame.seq, Some(0));
    }

    #[tokio::test]
    async fn broadcast_excludes_sender_session() {
        let hub = ChatHub::new();
        let chat_id = ChatId::new();
        let (sender_session, mut sender_rx) = hub.register(chat_id, UserId::new());
        let (_other_session, mut other_rx) = hub.register(chat_id, UserId::new());

        hub.broadcast(chat_id, "message.new", serde_json::json!({}), Some(sender_session));

        assert!(sender_rx.try_recv().is_err());
        assert!(other_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn slow_consumer_is_dropped_without_affecting_others() {
        let hub = ChatHub::new();
        let chat_id = ChatId::new();
        let (slow_session, slow_rx) = hub.register(chat_id, UserId::new());
        let (_fast_session, mut fast_rx) = hub.register(chat_id, UserId::new());

        // Saturate the slow session's queue without draining it.
        for i in 0..OUTBOUND_QUEUE_CAPACITY + 8 {
            hub.broadcast(chat_id, "message.new", serde_json::json!({"i": i}), None);
        }

        assert_eq!(hub.count(chat_id), 1, "slow session should have been dropped");
        assert!(fast_rx.try_recv().is_ok());
        drop(slow_rx);
        let _ = slow_session;
    }

    #[tokio::test]
    async fn sequence_numbers_are_monotonic_per_chat() {
        let hub = ChatHub::new();
        let chat_id = ChatId::new();
        let (_s, mut rx) = hub.register(chat_id, UserId::new());

        hub.broadcast(chat_id, "message.new", serde_json::json!({}), None);
        hub.broadcast(chat_id, "message.new", serde_json::json!({}), None);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(first.seq.unwrap() < second.seq.unwrap());
    }

    #[tokio::test]
    async fn unregister_removes_from_both_maps() {
        let hub = ChatHub::new();
        let chat_id = ChatId::new();
        let user_id = UserId::new();
        let (session_id, _rx) = hub.register(chat_id, user_id);

        hub.unregister(chat_id, user_id, session_id);

        assert_eq!(hub.count(chat_id), 0);
    }
}
