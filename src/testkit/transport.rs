//! Recording chat transport.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::TelegramId;
use crate::error::{Error, Result};
use crate::port::outbound::transport::ChatTransport;

/// One delivered item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message {
        chat: TelegramId,
        html: String,
    },
    Photo {
        chat: TelegramId,
        url: String,
        caption: String,
    },
    Document {
        chat: TelegramId,
        file_name: String,
        size: usize,
        caption: String,
    },
}

impl Sent {
    pub fn chat(&self) -> TelegramId {
        match self {
            Self::Message { chat, .. } | Self::Photo { chat, .. } | Self::Document { chat, .. } => {
                *chat
            }
        }
    }

    /// Message body or caption.
    pub fn text(&self) -> &str {
        match self {
            Self::Message { html, .. } => html,
            Self::Photo { caption, .. } | Self::Document { caption, .. } => caption,
        }
    }
}

/// Records every delivery. Photos or whole chats can be made to fail.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    failing_chats: Mutex<HashSet<TelegramId>>,
    fail_photos: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_photos(&self) {
        self.fail_photos.store(true, Ordering::SeqCst);
    }

    pub fn fail_chat(&self, chat: TelegramId) {
        self.failing_chats.lock().insert(chat);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, chat: TelegramId) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|item| item.chat() == chat)
            .collect()
    }

    fn check_chat(&self, chat: TelegramId) -> Result<()> {
        if self.failing_chats.lock().contains(&chat) {
            return Err(Error::Delivery(format!("chat {chat} blocked the bot")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, chat: TelegramId, html: &str) -> Result<()> {
        self.check_chat(chat)?;
        self.sent.lock().push(Sent::Message {
            chat,
            html: html.to_string(),
        });
        Ok(())
    }

    async fn send_photo(&self, chat: TelegramId, photo_url: &str, caption_html: &str) -> Result<()> {
        self.check_chat(chat)?;
        if self.fail_photos.load(Ordering::SeqCst) {
            return Err(Error::Delivery("wrong file identifier".into()));
        }
        self.sent.lock().push(Sent::Photo {
            chat,
            url: photo_url.to_string(),
            caption: caption_html.to_string(),
        });
        Ok(())
    }

    async fn send_document(
        &self,
        chat: TelegramId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        self.check_chat(chat)?;
        self.sent.lock().push(Sent::Document {
            chat,
            file_name: file_name.to_string(),
            size: bytes.len(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}
