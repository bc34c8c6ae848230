//! Bulk deletion of old order and sale history.

use std::time::Instant;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use tracing::debug;

use super::database::model::ts;
use super::SqliteStore;
use crate::error::Result;
use crate::port::outbound::store::{RetentionReport, RetentionSweeper};

const ORDERS: &str = "DELETE FROM orders WHERE rowid IN (\
    SELECT rowid FROM orders WHERE COALESCE(date, last_change_date) < ? LIMIT ?)";
const SALES: &str = "DELETE FROM sales WHERE rowid IN (\
    SELECT rowid FROM sales WHERE COALESCE(date, last_change_date) < ? LIMIT ?)";
const REPORT_DETAILS: &str = "DELETE FROM report_details WHERE rowid IN (\
    SELECT rowid FROM report_details WHERE COALESCE(order_dt, create_dt) < ? LIMIT ?)";

impl SqliteStore {
    /// Delete in batches until a batch comes back short or the deadline
    /// passes. Returns rows deleted and whether the deadline was hit.
    fn sweep_table(
        &self,
        statement: &str,
        cutoff: &str,
        batch_size: usize,
        deadline: Instant,
    ) -> Result<(usize, bool)> {
        let limit = i64::try_from(batch_size).unwrap_or(i64::MAX);
        let mut deleted = 0;
        loop {
            if Instant::now() >= deadline {
                return Ok((deleted, true));
            }
            let mut conn = self.conn()?;
            let batch = diesel::sql_query(statement)
                .bind::<Text, _>(cutoff)
                .bind::<BigInt, _>(limit)
                .execute(&mut conn)?;
            deleted += batch;
            debug!(batch, deleted, "retention batch");
            if batch < batch_size {
                return Ok((deleted, false));
            }
        }
    }
}

impl RetentionSweeper for SqliteStore {
    fn sweep(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: usize,
        budget: std::time::Duration,
    ) -> Result<RetentionReport> {
        let deadline = Instant::now() + budget;
        let cutoff = ts(cutoff);
        let batch_size = batch_size.max(1);

        let (orders_deleted, orders_cut) =
            self.sweep_table(ORDERS, &cutoff, batch_size, deadline)?;
        let (sales_deleted, sales_cut) = self.sweep_table(SALES, &cutoff, batch_size, deadline)?;
        let (report_lines_deleted, report_cut) =
            self.sweep_table(REPORT_DETAILS, &cutoff, batch_size, deadline)?;

        Ok(RetentionReport {
            orders_deleted,
            sales_deleted,
            report_lines_deleted,
            timed_out: orders_cut || sales_cut || report_cut,
        })
    }
}
