//! Bot API implementation of [`ChatTransport`].

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tracing::debug;

use crate::domain::TelegramId;
use crate::error::{Error, Result};
use crate::port::outbound::transport::ChatTransport;

/// Sends HTML-formatted messages, photos and documents through a bot.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Self {
        Self::new(Bot::new(token))
    }

    #[must_use]
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn delivery(err: teloxide::RequestError) -> Error {
    Error::Delivery(err.to_string())
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat: TelegramId, html: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat.get()), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(delivery)?;
        debug!(chat = chat.get(), "message delivered");
        Ok(())
    }

    async fn send_photo(&self, chat: TelegramId, photo_url: &str, caption_html: &str) -> Result<()> {
        let url = url::Url::parse(photo_url)?;
        self.bot
            .send_photo(ChatId(chat.get()), InputFile::url(url))
            .caption(caption_html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(delivery)?;
        debug!(chat = chat.get(), "photo delivered");
        Ok(())
    }

    async fn send_document(
        &self,
        chat: TelegramId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        let file = InputFile::memory(bytes).file_name(file_name.to_string());
        self.bot
            .send_document(ChatId(chat.get()), file)
            .caption(caption)
            .await
            .map_err(delivery)?;
        debug!(chat = chat.get(), file_name, "document delivered");
        Ok(())
    }
}
