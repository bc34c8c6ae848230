//! Incremental sync of marketplace statistics.
//!
//! One [`Poller`] per domain reads a trailing window for every active
//! credential, merges it into the store and returns what changed.

mod poller;
mod report;
mod tracker;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

pub use poller::Poller;
pub use report::{ReportSync, REPORT_PERIOD_DAYS};
pub use tracker::{
    CoefficientsTracker, IncomesTracker, Normalize, OrdersTracker, SalesTracker, StocksTracker,
    SyncDomain, Tracker,
};

use crate::application::products::ProductCatalog;
use crate::domain::{ChangedRecord, Watermark};
use crate::error::Result;
use crate::port::outbound::gateway::StatisticsGateway;
use crate::port::outbound::store::{CredentialStore, ProductStore, RecordStore};

/// Trailing windows and the initial watermark lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindows {
    pub orders: Duration,
    pub sales: Duration,
    pub stocks: Duration,
    pub incomes: Duration,
    pub initial_lag: Duration,
}

impl Default for SyncWindows {
    fn default() -> Self {
        Self {
            orders: Duration::days(7),
            sales: Duration::days(90),
            stocks: Duration::days(90),
            incomes: Duration::days(90),
            initial_lag: Duration::minutes(30),
        }
    }
}

/// The five domain pollers with their watermarks.
pub struct Pollers<S> {
    pub orders: Poller<S, OrdersTracker>,
    pub sales: Poller<S, SalesTracker>,
    pub stocks: Poller<S, StocksTracker>,
    pub incomes: Poller<S, IncomesTracker>,
    pub coefficients: Poller<S, CoefficientsTracker>,
}

impl<S> Pollers<S>
where
    S: CredentialStore + RecordStore + ProductStore + 'static,
{
    pub fn new(
        store: &Arc<S>,
        gateway: &Arc<dyn StatisticsGateway>,
        catalog: &Arc<ProductCatalog<S>>,
        windows: SyncWindows,
        now: DateTime<Utc>,
    ) -> Self {
        let mark = || Watermark::lagging(now, windows.initial_lag);
        Self {
            orders: Poller::new(store.clone(), gateway.clone(), mark(), Some(windows.orders))
                .with_catalog(catalog.clone()),
            sales: Poller::new(store.clone(), gateway.clone(), mark(), Some(windows.sales))
                .with_catalog(catalog.clone()),
            stocks: Poller::new(store.clone(), gateway.clone(), mark(), Some(windows.stocks))
                .with_catalog(catalog.clone()),
            incomes: Poller::new(store.clone(), gateway.clone(), mark(), Some(windows.incomes)),
            coefficients: Poller::new(store.clone(), gateway.clone(), mark(), None),
        }
    }

    /// Run one cycle of the given domain.
    pub async fn poll(&self, domain: SyncDomain, now: DateTime<Utc>) -> Result<Vec<ChangedRecord>> {
        match domain {
            SyncDomain::Orders => self.orders.poll_at(now).await,
            SyncDomain::Sales => self.sales.poll_at(now).await,
            SyncDomain::Stocks => self.stocks.poll_at(now).await,
            SyncDomain::Incomes => self.incomes.poll_at(now).await,
            SyncDomain::Coefficients => self.coefficients.poll_at(now).await,
        }
    }
}
