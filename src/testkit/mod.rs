//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`store`]: Migrated in-memory SQLite store.
//! - [`builders`]: Records, products and credential values with sane defaults.
//! - [`gateway`]: `ScriptedGateway`, a statistics API serving canned rows.
//! - [`transport`]: `RecordingTransport`, which keeps every delivery.
//! - [`billing`]: Fake payment provider and catalog enricher.

pub mod billing;
pub mod builders;
pub mod gateway;
pub mod store;
pub mod transport;
