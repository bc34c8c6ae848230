//! Chat delivery port.

use async_trait::async_trait;

use crate::domain::TelegramId;
use crate::error::Result;

/// Sends HTML-formatted messages to a chat.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, chat: TelegramId, html: &str) -> Result<()>;

    async fn send_photo(&self, chat: TelegramId, photo_url: &str, caption_html: &str) -> Result<()>;

    async fn send_document(
        &self,
        chat: TelegramId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<()>;
}
