//! Daily report contents and per-article summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::{CredentialId, NmId};
use super::record::{Order, Sale, StockLevel};

/// Telegram rejects documents above this size.
pub const MAX_DOCUMENT_BYTES: usize = 50_000_000;

/// Everything that happened to one credential in a reporting window.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySnapshot {
    pub credential_id: CredentialId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub orders: Vec<Order>,
    pub sales: Vec<Sale>,
    pub cancellations: Vec<Order>,
    pub out_of_stock: Vec<StockLevel>,
}

impl DailySnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
            && self.sales.is_empty()
            && self.cancellations.is_empty()
            && self.out_of_stock.is_empty()
    }
}

/// Totals for one article size over a reporting window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSummary {
    pub nm_id: NmId,
    pub tech_size: String,
    pub supplier_article: Option<String>,
    pub subject: Option<String>,
    pub orders: u32,
    pub order_sum: Decimal,
    pub cancels: u32,
    pub cancel_sum: Decimal,
    pub sales: u32,
    pub sale_sum: Decimal,
}

impl ArticleSummary {
    fn new(nm_id: NmId, tech_size: String) -> Self {
        Self {
            nm_id,
            tech_size,
            supplier_article: None,
            subject: None,
            orders: 0,
            order_sum: Decimal::ZERO,
            cancels: 0,
            cancel_sum: Decimal::ZERO,
            sales: 0,
            sale_sum: Decimal::ZERO,
        }
    }
}

fn summary_row<'a>(
    rows: &'a mut BTreeMap<(NmId, String), ArticleSummary>,
    nm_id: NmId,
    size: &Option<String>,
    article: &Option<String>,
    subject: &Option<String>,
) -> &'a mut ArticleSummary {
    let size = size.clone().unwrap_or_default();
    let row = rows
        .entry((nm_id, size.clone()))
        .or_insert_with(|| ArticleSummary::new(nm_id, size));
    if row.supplier_article.is_none() {
        row.supplier_article.clone_from(article);
    }
    if row.subject.is_none() {
        row.subject.clone_from(subject);
    }
    row
}

/// Group a snapshot by article and size, busiest first. Records without an
/// article id are skipped.
#[must_use]
pub fn summarize(snapshot: &DailySnapshot) -> Vec<ArticleSummary> {
    let mut rows: BTreeMap<(NmId, String), ArticleSummary> = BTreeMap::new();

    for order in &snapshot.orders {
        let Some(nm_id) = order.nm_id else { continue };
        let row = summary_row(
            &mut rows,
            nm_id,
            &order.tech_size,
            &order.supplier_article,
            &order.subject,
        );
        row.orders += 1;
        row.order_sum += order.price_with_disc;
    }
    for order in &snapshot.cancellations {
        let Some(nm_id) = order.nm_id else { continue };
        let row = summary_row(
            &mut rows,
            nm_id,
            &order.tech_size,
            &order.supplier_article,
            &order.subject,
        );
        row.cancels += 1;
        row.cancel_sum += order.price_with_disc;
    }
    for sale in &snapshot.sales {
        let Some(nm_id) = sale.nm_id else { continue };
        let row = summary_row(
            &mut rows,
            nm_id,
            &sale.tech_size,
            &sale.supplier_article,
            &sale.subject,
        );
        row.sales += 1;
        row.sale_sum += sale.price_with_disc;
    }

    let mut rows: Vec<ArticleSummary> = rows.into_values().collect();
    rows.sort_by(|a, b| b.orders.cmp(&a.orders).then(b.sales.cmp(&a.sales)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::builders;
    use rust_decimal_macros::dec;

    #[test]
    fn summary_groups_by_article_and_size() {
        let now = Utc::now();
        let credential = CredentialId::new(1);
        let mut other_size = builders::order(credential, "O3", now);
        other_size.tech_size = Some("L".into());
        let mut cancelled = builders::order(credential, "C1", now);
        cancelled.is_cancel = true;
        let mut unknown = builders::order(credential, "O4", now);
        unknown.nm_id = None;

        let snapshot = DailySnapshot {
            credential_id: credential,
            from: now,
            to: now,
            orders: vec![
                builders::order(credential, "O1", now),
                builders::order(credential, "O2", now),
                other_size,
                unknown,
            ],
            sales: vec![builders::sale(credential, "S1", now)],
            cancellations: vec![cancelled],
            out_of_stock: Vec::new(),
        };

        let rows = summarize(&snapshot);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tech_size, "M");
        assert_eq!(rows[0].orders, 2);
        assert_eq!(rows[0].order_sum, dec!(2000));
        assert_eq!(rows[0].cancels, 1);
        assert_eq!(rows[0].sales, 1);
        assert_eq!(rows[0].supplier_article.as_deref(), Some("ART-1"));
        assert_eq!(rows[1].tech_size, "L");
        assert_eq!(rows[1].orders, 1);
    }
}
