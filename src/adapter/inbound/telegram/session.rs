//! In-memory conversation state per chat.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::domain::session::{Conversation, ConversationEvent, Step};
use crate::domain::TelegramId;

/// Conversation state for every chat currently in a flow.
///
/// State is lost on restart; an interrupted flow simply starts over.
pub struct Sessions {
    chats: DashMap<TelegramId, Conversation>,
    timeout: Duration,
}

impl Sessions {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            chats: DashMap::new(),
            timeout,
        }
    }

    /// Feed an event to the chat's state machine.
    pub fn handle(&self, chat: TelegramId, event: ConversationEvent, now: DateTime<Utc>) -> Step {
        let mut entry = self
            .chats
            .entry(chat)
            .or_insert_with(|| Conversation::new(self.timeout));
        let step = entry.handle(event, now);
        let idle = entry.state().is_idle();
        drop(entry);
        if idle {
            self.chats.remove(&chat);
        }
        step
    }

    /// True while the chat is waiting for free-text input.
    #[must_use]
    pub fn is_active(&self, chat: TelegramId) -> bool {
        self.chats.contains_key(&chat)
    }

    /// Drop flows that timed out. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.chats.len();
        self.chats.retain(|_, conversation| !conversation.is_expired(now));
        before - self.chats.len()
    }
}
