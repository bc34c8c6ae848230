//! Stockpulse - marketplace statistics sync with Telegram notifications.
//!
//! Polls the Wildberries seller statistics API for every registered
//! credential, stores what changed and notifies the Telegram users bound to
//! that credential. Features are gated by subscription role; paid roles are
//! bought through YooKassa.
//!
//! # Modules
//!
//! - [`domain`] - Records, credentials, roles, tariffs and pure rules
//! - [`port`] - Storage, gateway, transport, billing and rendering traits
//! - [`application`] - Pollers, dispatcher, gate, subscriptions, scheduler
//! - [`adapter`] - SQLite, Wildberries, YooKassa, CSV and Telegram adapters
//! - [`infrastructure`] - Configuration and runtime wiring
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `telegram` (default) - Bot API transport and update loop
//! - `testkit` - Fakes and builders for integration tests

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
