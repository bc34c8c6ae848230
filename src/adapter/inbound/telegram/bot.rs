//! Bot API update loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{
    BotCommand as MenuCommand, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::command::bot_commands;
use super::handler::{BotContext, Response};
use super::menu::{Button, Keyboard};
use crate::domain::TelegramId;
use crate::port::outbound::store::Store;

const FAILURE_TEXT: &str = "Произошла ошибка. Попробуйте ещё раз позже.";

/// How often abandoned conversations are dropped.
const SESSION_PURGE_PERIOD: Duration = Duration::from_secs(60);

fn button(button: &Button) -> Option<InlineKeyboardButton> {
    match button {
        Button::Callback { text, action } => Some(InlineKeyboardButton::callback(
            text.clone(),
            action.to_string(),
        )),
        Button::Url { text, url } => match url::Url::parse(url) {
            Ok(url) => Some(InlineKeyboardButton::url(text.clone(), url)),
            Err(e) => {
                warn!(url = %url, error = %e, "button dropped: invalid url");
                None
            }
        },
    }
}

fn markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        keyboard
            .iter()
            .map(|row| row.iter().filter_map(button).collect::<Vec<_>>()),
    )
}

async fn deliver(bot: &Bot, chat: ChatId, response: Response) -> ResponseResult<()> {
    for reply in response.replies {
        let mut request = bot
            .send_message(chat, reply.text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = reply.keyboard.as_ref() {
            request = request.reply_markup(markup(keyboard));
        }
        request.await?;
    }
    Ok(())
}

async fn on_message<S: Store>(
    bot: Bot,
    msg: Message,
    ctx: Arc<BotContext<S>>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat = TelegramId::new(msg.chat.id.0);

    let response = match ctx.handle_message(chat, text, Utc::now()).await {
        Ok(response) => response,
        Err(e) => {
            error!(chat = chat.get(), error = %e, "message handling failed");
            bot.send_message(msg.chat.id, FAILURE_TEXT).await?;
            return Ok(());
        }
    };
    deliver(&bot, msg.chat.id, response).await
}

async fn on_callback<S: Store>(
    bot: Bot,
    q: CallbackQuery,
    ctx: Arc<BotContext<S>>,
) -> ResponseResult<()> {
    // Private chats share the user's id.
    let chat_id = ChatId::from(q.from.id);
    let chat = TelegramId::new(chat_id.0);
    let data = q.data.as_deref().unwrap_or_default();
    debug!(chat = chat.get(), data, "callback received");

    let response = match ctx.handle_callback(chat, data, Utc::now()).await {
        Ok(response) => response,
        Err(e) => {
            error!(chat = chat.get(), error = %e, "callback handling failed");
            Response {
                notice: Some(FAILURE_TEXT.to_string()),
                ..Response::default()
            }
        }
    };

    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(notice) = response.notice.clone() {
        answer = answer.text(notice);
    }
    answer.await?;
    deliver(&bot, chat_id, response).await
}

/// Register bot commands with Telegram for the "/" menu.
async fn register_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands: Vec<MenuCommand> = bot_commands()
        .into_iter()
        .map(|(cmd, desc)| MenuCommand::new(cmd, desc))
        .collect();

    bot.set_my_commands(commands).await?;
    info!("registered bot commands");
    Ok(())
}

/// Serve updates until `shutdown` turns true or its sender is dropped.
pub async fn run_bot<S: Store>(
    bot: Bot,
    ctx: Arc<BotContext<S>>,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = register_bot_commands(&bot).await {
        warn!(error = %e, "failed to register bot commands");
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message::<S>))
        .branch(Update::filter_callback_query().endpoint(on_callback::<S>));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::clone(&ctx)])
        .build();
    let token = dispatcher.shutdown_token();

    let purge = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_PERIOD);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let purged = ctx.sessions().purge_expired(Utc::now());
                    if purged > 0 {
                        debug!(purged, "expired conversations dropped");
                    }
                }
            }
        }
        match token.shutdown() {
            Ok(stopped) => stopped.await,
            Err(e) => warn!(error = %e, "bot was not running at shutdown"),
        }
    });

    info!("bot listening for updates");
    dispatcher.dispatch().await;
    purge.abort();
    info!("bot stopped");
}
