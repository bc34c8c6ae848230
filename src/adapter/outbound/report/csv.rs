//! Reports as CSV sheets.
//!
//! In the daily report, rows from every section share one header and the
//! `section` column tells them apart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::report::{ArticleSummary, DailySnapshot};
use crate::domain::{Order, Sale, StockLevel};
use crate::error::{Error, Result};
use crate::port::outbound::report::ReportRenderer;

const HEADER: [&str; 11] = [
    "section",
    "date",
    "id",
    "nm_id",
    "supplier_article",
    "subject",
    "warehouse",
    "region",
    "price_with_disc",
    "total_price",
    "quantity",
];

const SUMMARY_HEADER: [&str; 10] = [
    "nm_id",
    "supplier_article",
    "subject",
    "size",
    "orders",
    "order_sum",
    "cancels",
    "cancel_sum",
    "sales",
    "sale_sum",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportRenderer;

impl CsvReportRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn money(value: Decimal) -> String {
    value.round_dp(2).to_string()
}

fn order_row(section: &str, order: &Order) -> Vec<String> {
    vec![
        section.to_string(),
        date(order.date.or(Some(order.last_change_date))),
        order.srid.clone(),
        order.nm_id.map(|id| id.to_string()).unwrap_or_default(),
        text(&order.supplier_article),
        text(&order.subject),
        text(&order.warehouse_name),
        text(&order.region_name),
        money(order.price_with_disc),
        money(order.total_price),
        "1".to_string(),
    ]
}

fn sale_row(sale: &Sale) -> Vec<String> {
    vec![
        "sale".to_string(),
        date(sale.date.or(Some(sale.last_change_date))),
        sale.sale_id.clone(),
        sale.nm_id.map(|id| id.to_string()).unwrap_or_default(),
        text(&sale.supplier_article),
        text(&sale.subject),
        text(&sale.warehouse_name),
        text(&sale.region_name),
        money(sale.price_with_disc),
        money(sale.total_price),
        "1".to_string(),
    ]
}

fn stock_row(stock: &StockLevel) -> Vec<String> {
    vec![
        "out_of_stock".to_string(),
        date(Some(stock.last_change_date)),
        String::new(),
        stock.nm_id.to_string(),
        String::new(),
        text(&stock.subject),
        stock.warehouse_name.clone(),
        String::new(),
        String::new(),
        String::new(),
        stock.quantity.to_string(),
    ]
}

fn summary_row(row: &ArticleSummary) -> Vec<String> {
    vec![
        row.nm_id.to_string(),
        text(&row.supplier_article),
        text(&row.subject),
        row.tech_size.clone(),
        row.orders.to_string(),
        money(row.order_sum),
        row.cancels.to_string(),
        money(row.cancel_sum),
        row.sales.to_string(),
        money(row.sale_sum),
    ]
}

fn write_err(e: ::csv::Error) -> Error {
    Error::Parse(format!("csv: {e}"))
}

fn finish(writer: ::csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| Error::Parse(format!("csv: {}", e.error())))
}

impl ReportRenderer for CsvReportRenderer {
    fn file_name(&self) -> &'static str {
        "report.csv"
    }

    fn render(&self, snapshot: &DailySnapshot) -> Result<Vec<u8>> {
        let mut writer = ::csv::Writer::from_writer(Vec::new());
        writer.write_record(HEADER).map_err(write_err)?;
        for order in &snapshot.orders {
            writer.write_record(order_row("order", order)).map_err(write_err)?;
        }
        for sale in &snapshot.sales {
            writer.write_record(sale_row(sale)).map_err(write_err)?;
        }
        for order in &snapshot.cancellations {
            writer.write_record(order_row("cancel", order)).map_err(write_err)?;
        }
        for stock in &snapshot.out_of_stock {
            writer.write_record(stock_row(stock)).map_err(write_err)?;
        }

        finish(writer)
    }

    fn render_summary(&self, rows: &[ArticleSummary]) -> Result<Vec<u8>> {
        let mut writer = ::csv::Writer::from_writer(Vec::new());
        writer.write_record(SUMMARY_HEADER).map_err(write_err)?;
        for row in rows {
            writer.write_record(summary_row(row)).map_err(write_err)?;
        }
        finish(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CredentialId;
    use crate::testkit::builders;

    #[test]
    fn renders_each_section_under_one_header() {
        let now = Utc::now();
        let credential = CredentialId::new(1);
        let mut cancelled = builders::order(credential, "C1", now);
        cancelled.is_cancel = true;
        let empty = builders::stock(credential, 7, "Коледино", 0, now);

        let snapshot = DailySnapshot {
            credential_id: credential,
            from: now,
            to: now,
            orders: vec![builders::order(credential, "O1", now)],
            sales: vec![builders::sale(credential, "S1", now)],
            cancellations: vec![cancelled],
            out_of_stock: vec![empty],
        };

        let bytes = CsvReportRenderer::new().render(&snapshot).unwrap();
        let body = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("section,date,id"));
        assert!(lines[1].starts_with("order,"));
        assert!(lines[2].starts_with("sale,"));
        assert!(lines[3].starts_with("cancel,"));
        assert!(lines[4].starts_with("out_of_stock,"));
        assert!(lines[4].contains("Коледино"));
    }

    #[test]
    fn summary_has_one_row_per_article_size() {
        let now = Utc::now();
        let credential = CredentialId::new(1);
        let snapshot = DailySnapshot {
            credential_id: credential,
            from: now,
            to: now,
            orders: vec![builders::order(credential, "O1", now)],
            sales: Vec::new(),
            cancellations: Vec::new(),
            out_of_stock: Vec::new(),
        };
        let rows = crate::domain::report::summarize(&snapshot);
        let bytes = CsvReportRenderer::new().render_summary(&rows).unwrap();
        let body = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], SUMMARY_HEADER.join(","));
        assert_eq!(lines[1], "100,ART-1,Футболки,M,1,1000,0,0,0,0");
    }

    #[test]
    fn empty_snapshot_is_header_only() {
        let now = Utc::now();
        let snapshot = DailySnapshot {
            credential_id: CredentialId::new(1),
            from: now,
            to: now,
            orders: Vec::new(),
            sales: Vec::new(),
            cancellations: Vec::new(),
            out_of_stock: Vec::new(),
        };
        let bytes = CsvReportRenderer::new().render(&snapshot).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 1);
    }
}
