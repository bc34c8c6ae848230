//! Marketplace statistics port.
//!
//! Raw records mirror the API payloads with every field optional; pollers
//! decide which rows are usable. Each call returns an explicit
//! [`GatewayError`] instead of an empty list on failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::time::lenient_f64;
use crate::error::GatewayError;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Default page size for the realization report.
pub const REPORT_PAGE_LIMIT: u32 = 100_000;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    pub srid: Option<String>,
    pub last_change_date: Option<String>,
    pub date: Option<String>,
    pub warehouse_name: Option<String>,
    pub region_name: Option<String>,
    pub subject: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub nm_id: Option<i64>,
    pub brand: Option<String>,
    pub price_with_disc: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub spp: Option<Decimal>,
    #[serde(default)]
    pub is_cancel: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSale {
    #[serde(rename = "saleID", alias = "saleId")]
    pub sale_id: Option<String>,
    pub last_change_date: Option<String>,
    pub date: Option<String>,
    pub warehouse_name: Option<String>,
    pub region_name: Option<String>,
    pub subject: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub nm_id: Option<i64>,
    pub brand: Option<String>,
    pub price_with_disc: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub spp: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStock {
    pub nm_id: Option<i64>,
    pub warehouse_name: Option<String>,
    pub last_change_date: Option<String>,
    pub quantity: Option<i32>,
    pub quantity_full: Option<i32>,
    pub in_way_to_client: Option<i32>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIncome {
    pub income_id: Option<i64>,
    pub number: Option<String>,
    pub date: Option<String>,
    pub last_change_date: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub barcode: Option<String>,
    pub quantity: Option<i32>,
    pub total_price: Option<Decimal>,
    pub date_close: Option<String>,
    pub warehouse_name: Option<String>,
    pub nm_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCoefficient {
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub coefficient: Option<f64>,
    #[serde(rename = "warehouseID")]
    pub warehouse_id: Option<i64>,
    pub warehouse_name: Option<String>,
    pub allow_unload: Option<bool>,
    pub box_type_name: Option<String>,
    #[serde(rename = "boxTypeID")]
    pub box_type_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub storage_coef: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub delivery_coef: Option<f64>,
    #[serde(default)]
    pub is_sorting_center: bool,
}

/// Realization report row. This endpoint uses snake_case keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawReportLine {
    pub rrd_id: Option<i64>,
    pub create_dt: Option<String>,
    pub order_dt: Option<String>,
    pub subject_name: Option<String>,
    pub nm_id: Option<i64>,
    pub brand_name: Option<String>,
    pub quantity: Option<i32>,
    pub retail_price: Option<Decimal>,
    pub retail_amount: Option<Decimal>,
    pub office_name: Option<String>,
    pub delivery_amount: Option<i32>,
    pub return_amount: Option<i32>,
    pub delivery_rub: Option<Decimal>,
    pub commission_percent: Option<Decimal>,
}

/// Time-windowed reads against the marketplace statistics API.
///
/// `credential` is the raw API token sent as the `Authorization` header.
#[async_trait]
pub trait StatisticsGateway: Send + Sync {
    /// Orders changed since `since` (`flag=0` semantics).
    async fn orders(&self, credential: &str, since: DateTime<Utc>) -> GatewayResult<Vec<RawOrder>>;

    async fn sales(&self, credential: &str, since: DateTime<Utc>) -> GatewayResult<Vec<RawSale>>;

    async fn stocks(&self, credential: &str, since: DateTime<Utc>) -> GatewayResult<Vec<RawStock>>;

    async fn incomes(&self, credential: &str, since: DateTime<Utc>)
        -> GatewayResult<Vec<RawIncome>>;

    /// Acceptance coefficients for the next two weeks. Takes no window.
    async fn acceptance_coefficients(&self, credential: &str)
        -> GatewayResult<Vec<RawCoefficient>>;

    /// One page of the realization report starting after `rrd_id`.
    async fn report_page(
        &self,
        credential: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        rrd_id: i64,
        limit: u32,
    ) -> GatewayResult<Vec<RawReportLine>>;

    /// Rows requested per realization report page.
    fn report_page_limit(&self) -> u32 {
        REPORT_PAGE_LIMIT
    }

    /// The whole realization report for a period, following `rrd_id` until
    /// a short page.
    async fn full_report(
        &self,
        credential: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> GatewayResult<Vec<RawReportLine>> {
        let limit = self.report_page_limit().max(1);
        let mut rows = Vec::new();
        let mut cursor = 0;
        loop {
            let page = self.report_page(credential, from, to, cursor, limit).await?;
            let page_len = page.len();
            let last = page.last().and_then(|row| row.rrd_id);
            rows.extend(page);

            match last {
                Some(next) if page_len >= limit as usize => cursor = next,
                _ => break,
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_order_reads_camel_case_payload() {
        let json = r#"{
            "srid": "S100",
            "lastChangeDate": "2025-03-12T10:00:00",
            "nmId": 123,
            "priceWithDisc": 999.5,
            "spp": 25,
            "isCancel": true
        }"#;
        let raw: RawOrder = serde_json::from_str(json).unwrap();
        assert_eq!(raw.srid.as_deref(), Some("S100"));
        assert_eq!(raw.nm_id, Some(123));
        assert!(raw.is_cancel);
        assert_eq!(raw.price_with_disc.map(|p| p.to_string()).as_deref(), Some("999.5"));
    }

    #[test]
    fn raw_sale_accepts_both_id_spellings() {
        let upper: RawSale = serde_json::from_str(r#"{"saleID": "R1"}"#).unwrap();
        let lower: RawSale = serde_json::from_str(r#"{"saleId": "R2"}"#).unwrap();
        assert_eq!(upper.sale_id.as_deref(), Some("R1"));
        assert_eq!(lower.sale_id.as_deref(), Some("R2"));
    }

    #[test]
    fn raw_coefficient_parses_decimal_comma() {
        let json = r#"{
            "date": "2025-03-12T00:00:00Z",
            "coefficient": 0,
            "warehouseID": 507,
            "boxTypeID": 2,
            "allowUnload": true,
            "storageCoef": "18,53"
        }"#;
        let raw: RawCoefficient = serde_json::from_str(json).unwrap();
        assert_eq!(raw.coefficient, Some(0.0));
        assert_eq!(raw.warehouse_id, Some(507));
        assert_eq!(raw.storage_coef, Some(18.53));
        assert_eq!(raw.delivery_coef, None);
    }

    #[tokio::test]
    async fn full_report_pages_by_the_gateway_limit() {
        use crate::testkit::gateway::ScriptedGateway;

        let gateway = ScriptedGateway::new();
        let rows = (1..=5)
            .map(|rrd_id| RawReportLine {
                rrd_id: Some(rrd_id),
                ..RawReportLine::default()
            })
            .collect();
        gateway.set_report("token", rows);
        gateway.set_report_page_limit(2);

        let now = Utc::now();
        let report = gateway.full_report("token", now, now).await.unwrap();
        let ids: Vec<_> = report.iter().filter_map(|row| row.rrd_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(gateway.calls().len(), 3);
    }
}
