//! Change-tracked record storage and the aggregate queries behind
//! notifications and the daily report.

use chrono::{DateTime, Utc};
use diesel::dsl::sum;
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::database::model::{
    decimal, ts, CoefficientRow, IncomeRow, OrderRow, ReportDetailRow, SaleRow, StockRow,
};
use super::database::schema::{
    acceptance_coefficients, incomes, orders, report_details, sales, stocks,
};
use super::SqliteStore;
use crate::domain::metrics::{start_of_day, trailing_start, ActivityCounts};
use crate::domain::report::DailySnapshot;
use crate::domain::{
    AcceptanceCoefficient, CredentialId, Income, NmId, Order, Reconciled, ReportLine, Sale,
    StockLevel, Tracked, WarehouseId,
};
use crate::error::{Error, Result};
use crate::port::outbound::store::RecordStore;

/// Row-level access for one tracked record type.
trait TrackedRow: Tracked + Sized {
    /// Normalize through the stored representation so re-observations
    /// compare equal to what was written.
    fn canonical(self) -> Result<Self>;

    fn load(conn: &mut SqliteConnection, record: &Self) -> Result<Option<Self>>;

    fn save(conn: &mut SqliteConnection, record: &Self) -> Result<()>;
}

macro_rules! tracked_row {
    ($record:ty, $row:ty, $table:ident, |$r:ident| $key:expr) => {
        impl TrackedRow for $record {
            fn canonical(self) -> Result<Self> {
                <$record>::try_from(<$row>::from(&self))
            }

            fn load(conn: &mut SqliteConnection, $r: &Self) -> Result<Option<Self>> {
                $table::table
                    .find($key)
                    .select(<$row>::as_select())
                    .first(conn)
                    .optional()?
                    .map(<$record>::try_from)
                    .transpose()
            }

            fn save(conn: &mut SqliteConnection, record: &Self) -> Result<()> {
                diesel::replace_into($table::table)
                    .values(&<$row>::from(record))
                    .execute(conn)?;
                Ok(())
            }
        }
    };
}

tracked_row!(Order, OrderRow, orders, |r| (r.credential_id.get(), r.srid.as_str()));
tracked_row!(Sale, SaleRow, sales, |r| (r.credential_id.get(), r.sale_id.as_str()));
tracked_row!(StockLevel, StockRow, stocks, |r| (
    r.credential_id.get(),
    r.nm_id.get(),
    r.warehouse_name.as_str()
));
tracked_row!(Income, IncomeRow, incomes, |r| (
    r.credential_id.get(),
    r.income_id,
    r.nm_id.get()
));
tracked_row!(AcceptanceCoefficient, CoefficientRow, acceptance_coefficients, |r| (
    r.credential_id.get(),
    r.warehouse_id.get(),
    r.box_type_id,
    ts(r.date)
));

impl SqliteStore {
    /// Apply a batch in one transaction, returning new and changed records.
    fn merge<T: TrackedRow>(&self, batch: Vec<T>) -> Result<Vec<T>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            let mut changed = Vec::new();
            for incoming in batch {
                let incoming = incoming.canonical()?;
                match T::load(conn, &incoming)? {
                    None => {
                        T::save(conn, &incoming)?;
                        changed.push(incoming);
                    }
                    Some(stored) => match T::reconcile(&stored, &incoming) {
                        Reconciled::Changed(merged) => {
                            T::save(conn, &merged)?;
                            changed.push(merged);
                        }
                        Reconciled::Backfilled(merged) => T::save(conn, &merged)?,
                        Reconciled::Unchanged => {}
                    },
                }
            }
            Ok(changed)
        })
    }
}

impl RecordStore for SqliteStore {
    async fn merge_orders(&self, batch: Vec<Order>) -> Result<Vec<Order>> {
        self.merge(batch)
    }

    async fn merge_sales(&self, batch: Vec<Sale>) -> Result<Vec<Sale>> {
        self.merge(batch)
    }

    async fn merge_stocks(&self, batch: Vec<StockLevel>) -> Result<Vec<StockLevel>> {
        self.merge(batch)
    }

    async fn merge_incomes(&self, batch: Vec<Income>) -> Result<Vec<Income>> {
        self.merge(batch)
    }

    async fn merge_coefficients(
        &self,
        batch: Vec<AcceptanceCoefficient>,
    ) -> Result<Vec<AcceptanceCoefficient>> {
        self.merge(batch)
    }

    async fn insert_report_lines(&self, lines: Vec<ReportLine>) -> Result<usize> {
        if lines.is_empty() {
            return Ok(0);
        }
        let rows: Vec<ReportDetailRow> = lines.iter().map(ReportDetailRow::from).collect();
        let mut conn = self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            let mut inserted = 0;
            for row in &rows {
                inserted += diesel::insert_or_ignore_into(report_details::table)
                    .values(row)
                    .execute(conn)?;
            }
            Ok(inserted)
        })
    }

    async fn order_activity(
        &self,
        credential_id: CredentialId,
        nm_id: NmId,
        now: DateTime<Utc>,
    ) -> Result<ActivityCounts> {
        let mut conn = self.conn()?;
        let base = || {
            orders::table
                .filter(orders::token_id.eq(credential_id.get()))
                .filter(orders::nm_id.eq(nm_id.get()))
                .filter(orders::is_cancel.eq(false))
        };
        let today = base()
            .filter(orders::date.ge(ts(start_of_day(now))))
            .count()
            .get_result(&mut conn)?;
        let trailing = base()
            .filter(orders::date.ge(ts(trailing_start(now))))
            .count()
            .get_result(&mut conn)?;
        Ok(ActivityCounts { today, trailing })
    }

    async fn sale_activity(
        &self,
        credential_id: CredentialId,
        nm_id: NmId,
        now: DateTime<Utc>,
    ) -> Result<ActivityCounts> {
        let mut conn = self.conn()?;
        let base = || {
            sales::table
                .filter(sales::token_id.eq(credential_id.get()))
                .filter(sales::nm_id.eq(nm_id.get()))
        };
        let today = base()
            .filter(sales::date.ge(ts(start_of_day(now))))
            .count()
            .get_result(&mut conn)?;
        let trailing = base()
            .filter(sales::date.ge(ts(trailing_start(now))))
            .count()
            .get_result(&mut conn)?;
        Ok(ActivityCounts { today, trailing })
    }

    async fn total_stock(&self, credential_id: CredentialId, nm_id: NmId) -> Result<i64> {
        let mut conn = self.conn()?;
        let total: Option<i64> = stocks::table
            .filter(stocks::token_id.eq(credential_id.get()))
            .filter(stocks::nm_id.eq(nm_id.get()))
            .select(sum(stocks::quantity))
            .first(&mut conn)?;
        Ok(total.unwrap_or(0))
    }

    async fn latest_delivery_cost(
        &self,
        credential_id: CredentialId,
        nm_id: NmId,
        office: &str,
    ) -> Result<Option<Decimal>> {
        let mut conn = self.conn()?;
        let cost: Option<f64> = report_details::table
            .filter(report_details::token_id.eq(credential_id.get()))
            .filter(report_details::nm_id.eq(nm_id.get()))
            .filter(report_details::office_name.eq(office))
            .filter(report_details::delivery_rub.gt(0.0))
            .order(report_details::rrd_id.desc())
            .select(report_details::delivery_rub)
            .first(&mut conn)
            .optional()?;
        Ok(cost.map(decimal))
    }

    async fn latest_commission(
        &self,
        credential_id: CredentialId,
        nm_id: NmId,
    ) -> Result<Option<Decimal>> {
        let mut conn = self.conn()?;
        let percent: Option<f64> = report_details::table
            .filter(report_details::token_id.eq(credential_id.get()))
            .filter(report_details::nm_id.eq(nm_id.get()))
            .filter(report_details::commission_percent.gt(0.0))
            .order(report_details::rrd_id.desc())
            .select(report_details::commission_percent)
            .first(&mut conn)
            .optional()?;
        Ok(percent.map(decimal))
    }

    async fn daily_snapshot(
        &self,
        credential_id: CredentialId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DailySnapshot> {
        let (from_ts, to_ts) = (ts(from), ts(to));
        let token = credential_id.get();
        let mut conn = self.conn()?;

        let placed: Vec<OrderRow> = orders::table
            .filter(orders::token_id.eq(token))
            .filter(orders::date.ge(from_ts.as_str()))
            .filter(orders::date.lt(to_ts.as_str()))
            .filter(orders::is_cancel.eq(false))
            .order(orders::date.asc())
            .select(OrderRow::as_select())
            .load(&mut conn)?;
        let cancelled: Vec<OrderRow> = orders::table
            .filter(orders::token_id.eq(token))
            .filter(orders::last_change_date.ge(from_ts.as_str()))
            .filter(orders::last_change_date.lt(to_ts.as_str()))
            .filter(orders::is_cancel.eq(true))
            .order(orders::last_change_date.asc())
            .select(OrderRow::as_select())
            .load(&mut conn)?;
        let sold: Vec<SaleRow> = sales::table
            .filter(sales::token_id.eq(token))
            .filter(sales::date.ge(from_ts.as_str()))
            .filter(sales::date.lt(to_ts.as_str()))
            .order(sales::date.asc())
            .select(SaleRow::as_select())
            .load(&mut conn)?;
        let empty: Vec<StockRow> = stocks::table
            .filter(stocks::token_id.eq(token))
            .filter(stocks::quantity.le(0))
            .order((stocks::nm_id.asc(), stocks::warehouse_name.asc()))
            .select(StockRow::as_select())
            .load(&mut conn)?;

        Ok(DailySnapshot {
            credential_id,
            from,
            to,
            orders: placed.into_iter().map(Order::try_from).collect::<Result<_>>()?,
            sales: sold.into_iter().map(Sale::try_from).collect::<Result<_>>()?,
            cancellations: cancelled
                .into_iter()
                .map(Order::try_from)
                .collect::<Result<_>>()?,
            out_of_stock: empty
                .into_iter()
                .map(StockLevel::try_from)
                .collect::<Result<_>>()?,
        })
    }

    async fn known_warehouses(&self) -> Result<Vec<(WarehouseId, String)>> {
        let mut conn = self.conn()?;
        let rows: Vec<(i64, Option<String>)> = acceptance_coefficients::table
            .select((
                acceptance_coefficients::warehouse_id,
                acceptance_coefficients::warehouse_name,
            ))
            .distinct()
            .load(&mut conn)?;

        let mut named: Vec<(WarehouseId, String)> = Vec::new();
        for (id, name) in rows {
            let id = WarehouseId::new(id);
            if named.iter().any(|(known, _)| *known == id) {
                continue;
            }
            named.push((id, name.unwrap_or_else(|| format!("Склад {id}"))));
        }
        named.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(named)
    }
}
