//! Wildberries HTTP adapters: the statistics API and the public catalog.

mod card;
mod client;

pub use card::{CardEnricher, DEFAULT_CARD_URL};
pub use client::{WildberriesClient, DEFAULT_STATISTICS_URL, DEFAULT_SUPPLIES_URL};
