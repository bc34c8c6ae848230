//! Catalog enrichment port.

use async_trait::async_trait;

use crate::domain::{NmId, ProductDetails};
use crate::error::Result;

/// Looks up public catalog details (rating, reviews, image) for an article.
#[async_trait]
pub trait ProductEnricher: Send + Sync {
    async fn details(&self, nm_id: NmId) -> Result<ProductDetails>;
}
