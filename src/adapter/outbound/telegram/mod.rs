//! Telegram delivery.
//!
//! Requires the `telegram` feature to be enabled.

mod transport;

pub use transport::TelegramTransport;
