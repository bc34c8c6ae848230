//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  sync · notify · gate   ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     ▼                         ▼                             ▼
//! ┌──────────┐           ┌─────────────┐              ┌────────────┐
//! │Statistics│           │   Store     │              │   Chat     │
//! │ Gateway  │           │   Adapter   │              │ Transport  │
//! └──────────┘           └─────────────┘              └────────────┘
//! ```
//!
//! Store ports return `impl Future` and are used through generics.
//! Ports backed by remote collaborators use `async_trait` so they can sit
//! behind `Arc<dyn _>` and be swapped for fakes.

pub mod outbound;

pub use outbound::billing::PaymentProvider;
pub use outbound::enrichment::ProductEnricher;
pub use outbound::gateway::StatisticsGateway;
pub use outbound::report::ReportRenderer;
pub use outbound::store::{
    CredentialStore, PaymentStore, ProductStore, RecordStore, RetentionSweeper, Store, UserStore,
};
pub use outbound::transport::ChatTransport;
