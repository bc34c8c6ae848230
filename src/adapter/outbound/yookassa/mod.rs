//! YooKassa payment provider.

mod client;
mod dto;

pub use client::{ReceiptSettings, YooKassaClient, DEFAULT_API_URL};
