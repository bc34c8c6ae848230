//! Telegram command parsing.

use crate::domain::PaymentId;

/// Supported bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// `/start`, optionally carrying the `paid` deep link back from checkout.
    Start { paid: Option<PaidLink> },
    Help,
    Cabinet,
    Settings,
    Tariffs,
    /// `/orders [days]`
    Orders { days: Option<u32> },
    /// `/my_products [days]`
    MyProducts { days: Option<u32> },
    /// Replace the bound seller token.
    Token,
    Position,
    Cancel,
}

/// The argument of `/start paid[_<id>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaidLink {
    pub payment_id: Option<PaymentId>,
}

/// Parse error for command messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    NotACommand,
    UnknownCommand(String),
    InvalidDays(String),
}

impl std::fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotACommand => write!(f, "message is not a command"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command `{cmd}`"),
            Self::InvalidDays(value) => write!(f, "invalid number of days `{value}`"),
        }
    }
}

impl std::error::Error for CommandParseError {}

/// Parse a message into a bot command.
pub fn parse_command(text: &str) -> Result<BotCommand, CommandParseError> {
    let mut parts = text.split_whitespace();
    let Some(raw_command) = parts.next() else {
        return Err(CommandParseError::NotACommand);
    };
    if !raw_command.starts_with('/') {
        return Err(CommandParseError::NotACommand);
    }

    let command = raw_command
        .split_once('@')
        .map_or(raw_command, |(head, _)| head);

    match command {
        "/start" => Ok(BotCommand::Start {
            paid: parts.next().and_then(parse_paid_link),
        }),
        "/help" => Ok(BotCommand::Help),
        "/cabinet" => Ok(BotCommand::Cabinet),
        "/settings" => Ok(BotCommand::Settings),
        "/tariffs" => Ok(BotCommand::Tariffs),
        "/orders" | "/orders_report" => Ok(BotCommand::Orders {
            days: parse_days(parts.next())?,
        }),
        "/my_products" => Ok(BotCommand::MyProducts {
            days: parse_days(parts.next())?,
        }),
        "/token" | "/replace_token" => Ok(BotCommand::Token),
        "/position" => Ok(BotCommand::Position),
        "/cancel" => Ok(BotCommand::Cancel),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn parse_days(raw: Option<&str>) -> Result<Option<u32>, CommandParseError> {
    raw.map(|value| {
        value
            .parse::<u32>()
            .ok()
            .filter(|days| *days > 0)
            .ok_or_else(|| CommandParseError::InvalidDays(value.to_string()))
    })
    .transpose()
}

/// `paid`, `paid_42`. A malformed id still counts as a paid link.
fn parse_paid_link(arg: &str) -> Option<PaidLink> {
    let rest = arg.strip_prefix("paid")?;
    let payment_id = rest
        .strip_prefix('_')
        .and_then(|tail| tail.parse::<i32>().ok())
        .map(PaymentId::new);
    Some(PaidLink { payment_id })
}

/// Help text returned by `/help`.
#[must_use]
pub const fn command_help() -> &'static str {
    "📋 Команды\n\n\
    /start - 🔑 Подключить API-ключ\n\
    /cabinet - 👤 Кабинет и подписка\n\
    /settings - ⚙️ Уведомления и склады\n\
    /orders - 📦 Отчёт по заказам\n\
    /my_products - 📊 Отчёт по товарам\n\
    /tariffs - 💳 Тарифы\n\
    /token - 🔁 Заменить API-ключ\n\
    /cancel - ✖️ Отменить текущее действие"
}

/// Bot commands for Telegram menu registration.
#[must_use]
pub fn bot_commands() -> Vec<(&'static str, &'static str)> {
    vec![
        ("start", "Подключить API-ключ"),
        ("cabinet", "Кабинет и подписка"),
        ("settings", "Уведомления и склады"),
        ("orders", "Отчёт по заказам"),
        ("my_products", "Отчёт по товарам"),
        ("tariffs", "Тарифы"),
        ("token", "Заменить API-ключ"),
        ("help", "Помощь"),
    ]
}
