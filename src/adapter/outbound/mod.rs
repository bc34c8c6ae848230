//! Outbound adapters (driven side).

pub mod report;
pub mod sqlite;
pub mod wildberries;
pub mod yookassa;

#[cfg(feature = "telegram")]
pub mod telegram;
