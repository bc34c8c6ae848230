//! Generic change-tracking poller.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::tracker::{Normalize, Tracker};
use crate::application::products::ProductCatalog;
use crate::domain::{ChangedRecord, Credential, Tracked, Watermark};
use crate::error::Result;
use crate::port::outbound::gateway::StatisticsGateway;
use crate::port::outbound::store::{CredentialStore, ProductStore, RecordStore};

/// Polls one statistics domain for every active credential.
///
/// The watermark only moves after the whole cycle, so a credential that
/// fails mid-cycle cannot hide changes from the others.
pub struct Poller<S, T> {
    store: Arc<S>,
    gateway: Arc<dyn StatisticsGateway>,
    catalog: Option<Arc<ProductCatalog<S>>>,
    watermark: Watermark,
    lookback: Option<Duration>,
    _tracker: PhantomData<fn() -> T>,
}

/// Outcome of one credential within a cycle.
enum Visit<R> {
    Synced {
        changed: Vec<R>,
        /// Newest change timestamp in the fetched batch, changed or not.
        newest: Option<DateTime<Utc>>,
    },
    Failed,
}

impl<S, T> Poller<S, T>
where
    S: CredentialStore + RecordStore + ProductStore + 'static,
    T: Tracker,
{
    /// `lookback` of `None` means the endpoint takes no window.
    pub fn new(
        store: Arc<S>,
        gateway: Arc<dyn StatisticsGateway>,
        watermark: Watermark,
        lookback: Option<Duration>,
    ) -> Self {
        Self {
            store,
            gateway,
            catalog: None,
            watermark,
            lookback,
            _tracker: PhantomData,
        }
    }

    /// Record first-sighted articles in the product cache.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<ProductCatalog<S>>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark.get()
    }

    pub async fn poll(&self) -> Result<Vec<ChangedRecord>> {
        self.poll_at(Utc::now()).await
    }

    /// Run one cycle as of `now` and return the detected changes.
    ///
    /// Only listing the credentials can fail the cycle; per-credential
    /// fetch and store errors are logged and skipped.
    pub async fn poll_at(&self, now: DateTime<Utc>) -> Result<Vec<ChangedRecord>> {
        let domain = T::DOMAIN.as_str();
        let credentials = self.store.active_credentials().await?;
        let fallback = self.watermark.get();
        let since = self.lookback.map_or(now, |lookback| now - lookback);

        let mut changed = Vec::new();
        let mut newest: Option<DateTime<Utc>> = None;
        let mut failed = 0usize;

        for credential in &credentials {
            match self.visit(credential, since, fallback, now).await {
                Visit::Synced {
                    changed: records,
                    newest: observed,
                } => {
                    newest = newest.max(observed);
                    changed.extend(records.into_iter().map(Into::into));
                }
                Visit::Failed => failed += 1,
            }
        }

        if let Some(newest) = newest {
            self.watermark.advance(newest);
        }

        info!(
            domain,
            credentials = credentials.len(),
            failed,
            changed = changed.len(),
            watermark = %self.watermark.get(),
            "poll cycle finished"
        );
        Ok(changed)
    }

    async fn visit(
        &self,
        credential: &Credential,
        since: DateTime<Utc>,
        fallback: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Visit<T::Record> {
        let domain = T::DOMAIN.as_str();
        let credential_id = credential.id.get();

        let raw = match T::fetch(self.gateway.as_ref(), &credential.value, since).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(domain, credential_id, error = %e, "fetch failed, skipping credential");
                return Visit::Failed;
            }
        };

        let ctx = Normalize {
            credential_id: credential.id,
            fallback,
            now,
        };
        let fetched = raw.len();
        let batch: Vec<T::Record> = raw
            .into_iter()
            .filter_map(|row| T::normalize(row, &ctx))
            .collect();
        let skipped = fetched - batch.len();
        let newest = batch.iter().map(Tracked::changed_at).max();

        let changed = match T::merge(self.store.as_ref(), batch).await {
            Ok(changed) => changed,
            Err(e) => {
                warn!(domain, credential_id, error = %e, "merge failed, skipping credential");
                return Visit::Failed;
            }
        };

        if let Some(catalog) = &self.catalog {
            for record in &changed {
                let Some((nm_id, seed)) = T::seed(record) else {
                    continue;
                };
                if let Err(e) = catalog.ensure(nm_id, credential.id, seed, now).await {
                    warn!(domain, nm_id = nm_id.get(), error = %e, "product upsert failed");
                }
            }
        }

        debug!(
            domain,
            credential_id,
            fetched,
            skipped,
            changed = changed.len(),
            "credential synced"
        );
        Visit::Synced { changed, newest }
    }
}
