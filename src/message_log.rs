//! Append-only, in-memory record of chat turns grouped by session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: u64,
    pub content: String,
    pub role: Role,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct LogInner {
    next_id: u64,
    sessions: HashMap<String, Vec<Message>>,
}

/// Process-lifetime message storage.
///
/// A single lock covers both the id counter and the per-session vectors, so
/// ids are unique across sessions and each session's timestamps never go
/// backwards.
#[derive(Debug)]
pub struct MessageLog {
    inner: Mutex<LogInner>,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LogInner {
                next_id: 1,
                sessions: HashMap::new(),
            }),
        }
    }

    pub async fn append(&self, session_id: &str, role: Role, content: impl Into<String>) -> Message {
        let mut inner = self.inner.lock().await;

        let id = inner.next_id;
        inner.next_id += 1;

        let session = inner.sessions.entry(session_id.to_string()).or_default();
        let now = Utc::now();
        // Clamp a wall clock that stepped backwards.
        let timestamp = match session.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let message = Message {
            id,
            content: content.into(),
            role,
            session_id: session_id.to_string(),
            timestamp,
        };
        session.push(message.clone());
        message
    }

    /// Snapshot of one session, oldest first.
    pub async fn list_by_session(&self, session_id: &str) -> Vec<Message> {
        let inner = self.inner.lock().await;
        let mut messages = inner.sessions.get(session_id).cloned().unwrap_or_default();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        messages
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_append_then_list_round_trips_in_order() {
        let log = MessageLog::new();
        for i in 0..10 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            log.append("s1", role, format!("message {i}")).await;
        }

        let messages = log.list_by_session("s1").await;
        assert_eq!(messages.len(), 10);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.content, format!("message {i}"));
            assert_eq!(msg.session_id, "s1");
        }
        for pair in messages.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn test_ids_start_at_one() {
        let log = MessageLog::new();
        let first = log.append("s", Role::User, "hi").await;
        assert_eq!(first.id, 1);
        assert_eq!(first.role, Role::User);
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let log = MessageLog::new();
        log.append("other", Role::User, "hello").await;
        assert!(log.list_by_session("missing").await.is_empty());
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let log = MessageLog::new();
        log.append("a", Role::User, "for a").await;
        log.append("b", Role::User, "for b").await;
        log.append("a", Role::Assistant, "reply a").await;

        let a = log.list_by_session("a").await;
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|m| m.session_id == "a"));
        assert_eq!(log.list_by_session("b").await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_a_snapshot() {
        let log = MessageLog::new();
        log.append("s", Role::User, "one").await;
        let snapshot = log.list_by_session("s").await;
        log.append("s", Role::User, "two").await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.list_by_session("s").await.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_get_unique_ids() {
        let log = Arc::new(MessageLog::new());
        let mut handles = Vec::new();
        for task in 0..8 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let session = format!("session-{task}");
                let mut ids = Vec::new();
                for i in 0..50 {
                    ids.push(log.append(&session, Role::User, format!("{i}")).await.id);
                }
                ids
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let ids = handle.await.unwrap();
            // Per-task ids are increasing.
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            for id in ids {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 400);
        assert_eq!(log.len().await, 400);
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let msg = Message {
            id: 7,
            content: "hello".to_string(),
            role: Role::Assistant,
            session_id: "s".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sessionId"], "s");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["id"], 7);
    }
}
