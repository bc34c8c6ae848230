//! Per-chat conversation state machine.
//!
//! Multi-step bot flows move through explicit states instead of ad-hoc
//! flags: idle → awaiting input → idle. Every non-idle state expires after
//! the configured timeout and can be cancelled.

use chrono::{DateTime, Duration, Utc};

use super::id::NmId;

/// Where a chat currently is in a multi-step flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    /// Waiting for a seller API token (first submission or replacement).
    AwaitingCredential { since: DateTime<Utc> },
    /// Position search: waiting for the catalog article.
    AwaitingArticle { since: DateTime<Utc> },
    /// Position search: article known, waiting for the search phrase.
    AwaitingQuery { article: NmId, since: DateTime<Utc> },
}

impl ConversationState {
    fn since(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Idle => None,
            Self::AwaitingCredential { since }
            | Self::AwaitingArticle { since }
            | Self::AwaitingQuery { since, .. } => Some(*since),
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    BeginCredentialEntry,
    BeginPositionSearch,
    Text(String),
    Cancel,
}

/// What the caller should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Prompt the user for the next piece of input.
    Prompt(Prompt),
    CredentialSubmitted(String),
    SearchRequested { article: NmId, query: String },
    /// The article was not a number; state is unchanged.
    InvalidArticle,
    Cancelled,
    /// The previous flow expired before this event arrived.
    TimedOut,
    /// Plain text outside any flow.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Credential,
    Article,
    Query,
}

/// A chat's conversation with its timeout.
#[derive(Debug, Clone)]
pub struct Conversation {
    state: ConversationState,
    timeout: Duration,
}

impl Conversation {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: ConversationState::Idle,
            timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// True when a non-idle state has outlived the timeout.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state
            .since()
            .is_some_and(|since| now - since > self.timeout)
    }

    pub fn handle(&mut self, event: ConversationEvent, now: DateTime<Utc>) -> Step {
        if self.is_expired(now) {
            self.state = ConversationState::Idle;
            if let ConversationEvent::Text(_) | ConversationEvent::Cancel = event {
                return Step::TimedOut;
            }
        }

        match (std::mem::take(&mut self.state), event) {
            (_, ConversationEvent::Cancel) => Step::Cancelled,
            (_, ConversationEvent::BeginCredentialEntry) => {
                self.state = ConversationState::AwaitingCredential { since: now };
                Step::Prompt(Prompt::Credential)
            }
            (_, ConversationEvent::BeginPositionSearch) => {
                self.state = ConversationState::AwaitingArticle { since: now };
                Step::Prompt(Prompt::Article)
            }
            (ConversationState::AwaitingCredential { .. }, ConversationEvent::Text(text)) => {
                Step::CredentialSubmitted(text.trim().to_string())
            }
            (ConversationState::AwaitingArticle { since }, ConversationEvent::Text(text)) => {
                match text.trim().parse::<i64>() {
                    Ok(article) if article > 0 => {
                        self.state = ConversationState::AwaitingQuery {
                            article: NmId::new(article),
                            since: now,
                        };
                        Step::Prompt(Prompt::Query)
                    }
                    _ => {
                        self.state = ConversationState::AwaitingArticle { since };
                        Step::InvalidArticle
                    }
                }
            }
            (ConversationState::AwaitingQuery { article, .. }, ConversationEvent::Text(text)) => {
                Step::SearchRequested {
                    article,
                    query: text.trim().to_string(),
                }
            }
            (ConversationState::Idle, ConversationEvent::Text(_)) => Step::Ignored,
        }
    }
}
