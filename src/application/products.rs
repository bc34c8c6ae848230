//! Product catalog cache.
//!
//! Records first-sighted articles and keeps their public catalog details
//! (rating, reviews, image) fresh. Enrichment is best effort: a failed
//! lookup never blocks a sync and never overwrites a stored row.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::domain::{CredentialId, NmId, Product, ProductDetails, ProductSeed};
use crate::error::Result;
use crate::port::outbound::enrichment::ProductEnricher;
use crate::port::outbound::store::ProductStore;

/// Staleness and concurrency settings for the catalog.
#[derive(Debug, Clone, Copy)]
pub struct CatalogConfig {
    pub max_age: Duration,
    pub refresh_concurrency: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::days(30),
            refresh_concurrency: 3,
        }
    }
}

/// Outcome of one staleness sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub failed: usize,
}

pub struct ProductCatalog<S> {
    store: Arc<S>,
    enricher: Arc<dyn ProductEnricher>,
    config: CatalogConfig,
    permits: Arc<Semaphore>,
}

impl<S: ProductStore> ProductCatalog<S> {
    pub fn new(store: Arc<S>, enricher: Arc<dyn ProductEnricher>, config: CatalogConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.refresh_concurrency.max(1)));
        Self {
            store,
            enricher,
            config,
            permits,
        }
    }

    async fn lookup(&self, nm_id: NmId) -> Option<ProductDetails> {
        let _permit = self.permits.acquire().await.ok()?;
        match self.enricher.details(nm_id).await {
            Ok(details) => Some(details),
            Err(e) => {
                warn!(nm_id = nm_id.get(), error = %e, "product enrichment failed");
                None
            }
        }
    }

    /// Store an article the first time a credential reports it.
    ///
    /// Returns the cached row, existing or new.
    pub async fn ensure(
        &self,
        nm_id: NmId,
        owner: CredentialId,
        seed: ProductSeed,
        now: DateTime<Utc>,
    ) -> Result<Product> {
        if let Some(existing) = self.store.product(nm_id).await? {
            return Ok(existing);
        }

        let mut product = Product {
            nm_id,
            owner_credential_id: owner,
            subject_name: seed.subject_name,
            brand_name: seed.brand_name,
            supplier_article: seed.supplier_article,
            tech_size: seed.tech_size,
            image_url: None,
            rating: None,
            reviews: None,
            thumbnail: None,
            last_update: now,
        };
        if let Some(details) = self.lookup(nm_id).await {
            apply_details(&mut product, details, now);
        }

        self.store.upsert_product(&product).await?;
        debug!(nm_id = nm_id.get(), owner = owner.get(), "product first seen");
        Ok(product)
    }

    /// Re-enrich products that are stale or were never rated.
    pub async fn refresh_stale(&self, now: DateTime<Utc>) -> Result<RefreshReport> {
        let stale = self.store.stale_products(now, self.config.max_age).await?;
        if stale.is_empty() {
            return Ok(RefreshReport::default());
        }

        let lookups = stale.into_iter().map(|product| async move {
            let details = self.lookup(product.nm_id).await;
            (product, details)
        });

        let mut report = RefreshReport::default();
        for (mut product, details) in join_all(lookups).await {
            let Some(details) = details else {
                report.failed += 1;
                continue;
            };
            apply_details(&mut product, details, now);
            match self.store.upsert_product(&product).await {
                Ok(()) => report.refreshed += 1,
                Err(e) => {
                    warn!(nm_id = product.nm_id.get(), error = %e, "failed to save product");
                    report.failed += 1;
                }
            }
        }

        info!(
            refreshed = report.refreshed,
            failed = report.failed,
            "product sweep finished"
        );
        Ok(report)
    }
}

fn apply_details(product: &mut Product, details: ProductDetails, now: DateTime<Utc>) {
    if product.subject_name.is_none() {
        product.subject_name = details.title;
    }
    if details.rating.is_some() {
        product.rating = details.rating;
    }
    if details.reviews.is_some() {
        product.reviews = details.reviews;
    }
    if details.image_url.is_some() {
        product.image_url = details.image_url;
    }
    if details.thumbnail.is_some() {
        product.thumbnail = details.thumbnail;
    }
    product.last_update = now;
}
