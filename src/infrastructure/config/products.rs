//! Product catalog refresh.

use serde::Deserialize;

use crate::application::products::CatalogConfig;

/// `[products]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProductsConfig {
    /// Products older than this are re-enriched.
    pub stale_days: i64,
    pub refresh_concurrency: usize,
}

impl ProductsConfig {
    #[must_use]
    pub fn catalog(&self) -> CatalogConfig {
        CatalogConfig {
            max_age: chrono::Duration::days(self.stale_days),
            refresh_concurrency: self.refresh_concurrency,
        }
    }
}

impl Default for ProductsConfig {
    fn default() -> Self {
        let catalog = CatalogConfig::default();
        Self {
            stale_days: catalog.max_age.num_days(),
            refresh_concurrency: catalog.refresh_concurrency,
        }
    }
}
