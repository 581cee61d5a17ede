//! Conversation memory
//!
//! A single append-only turn log owned by the application state. Turn
//! storage sits behind an async `RwLock`; whole question/answer exchanges
//! are serialized by a separate mutex so turns from concurrent requests
//! never interleave, while readers never wait on a slow generation.
//!
//! Nothing here is persisted; history is lost on restart.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Speaker of a turn, serialized as `human` / `ai`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    #[serde(rename = "human")]
    User,
    #[serde(rename = "ai")]
    Assistant,
}

/// One recorded turn
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Held for the duration of one question/answer exchange
pub struct ExchangeGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

/// Process-wide conversation log
#[derive(Default)]
pub struct ConversationState {
    turns: RwLock<Vec<Turn>>,
    exchange: Mutex<()>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other exchange is in flight
    pub async fn begin_exchange(&self) -> ExchangeGuard<'_> {
        ExchangeGuard {
            _guard: self.exchange.lock().await,
        }
    }

    /// Append a turn at the end of the log
    pub async fn append(&self, role: Role, content: impl Into<String>) {
        let turn = Turn {
            role,
            content: content.into(),
            created_at: Utc::now(),
        };
        let mut turns = self.turns.write().await;
        turns.push(turn);
        tracing::debug!(role = ?role, total = turns.len(), "Turn recorded");
    }

    /// The most recent `n` turns, oldest first
    pub async fn last(&self, n: usize) -> Vec<Turn> {
        let turns = self.turns.read().await;
        let start = turns.len().saturating_sub(n);
        turns[start..].to_vec()
    }

    pub async fn len(&self) -> usize {
        self.turns.read().await.len()
    }
}
