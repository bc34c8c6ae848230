//! Telegram front-end.
//!
//! Commands and button payloads are decoded once into [`BotCommand`] and
//! [`CallbackAction`]; [`BotContext`] maps them onto application services.
//! Only [`bot`] touches the Bot API and needs the `telegram` feature.

pub mod callback;
pub mod command;
pub mod handler;
pub mod menu;
pub mod session;

#[cfg(feature = "telegram")]
pub mod bot;

pub use callback::CallbackAction;
pub use command::{parse_command, BotCommand};
pub use handler::{BotContext, BotSettings, Response};
