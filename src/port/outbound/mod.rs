//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe infrastructure dependencies: the marketplace
//! statistics API, storage, chat delivery, billing, catalog enrichment and
//! report rendering.

pub mod billing;
pub mod enrichment;
pub mod gateway;
pub mod report;
pub mod store;
pub mod transport;
