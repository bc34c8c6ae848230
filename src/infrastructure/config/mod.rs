//! Configuration loading and validation.

pub mod gateway;
pub mod logging;
pub mod payment;
pub mod products;
pub mod retention;
pub mod settings;
pub mod sync;
pub mod telegram;
