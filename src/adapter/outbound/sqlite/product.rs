//! Product cache queries.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;

use super::database::model::{ts, ProductRow};
use super::database::schema::products;
use super::SqliteStore;
use crate::domain::{NmId, Product};
use crate::error::Result;
use crate::port::outbound::store::ProductStore;

impl ProductStore for SqliteStore {
    async fn product(&self, nm_id: NmId) -> Result<Option<Product>> {
        let mut conn = self.conn()?;
        products::table
            .find(nm_id.get())
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Product::try_from)
            .transpose()
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::replace_into(products::table)
            .values(&ProductRow::from(product))
            .execute(&mut conn)?;
        Ok(())
    }

    async fn stale_products(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Result<Vec<Product>> {
        let cutoff = ts(now - max_age);
        let mut conn = self.conn()?;
        let rows = products::table
            .filter(
                products::rating
                    .is_null()
                    .or(products::last_update.lt(cutoff.as_str())),
            )
            .order(products::last_update.asc())
            .select(ProductRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(Product::try_from).collect()
    }
}
