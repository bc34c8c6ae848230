//! Change-tracked marketplace records.
//!
//! Every record is scoped to one credential and identified by a natural key
//! within it. [`Tracked::reconcile`] decides what a re-observation does to
//! the stored row.

use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::id::{CredentialId, NmId, WarehouseId};

/// Outcome of merging an incoming observation into a stored row.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled<T> {
    /// Mutable fields moved forward; persist and report the change.
    Changed(T),
    /// Empty descriptive fields were filled in; persist silently.
    Backfilled(T),
    Unchanged,
}

/// A record with a per-credential natural key and a change timestamp.
pub trait Tracked: Clone + Send + Sync + 'static {
    type Key: Eq + Hash + Clone + Debug + Send;

    fn credential_id(&self) -> CredentialId;

    fn key(&self) -> Self::Key;

    /// Timestamp used for watermark advancement.
    fn changed_at(&self) -> DateTime<Utc>;

    fn reconcile(stored: &Self, incoming: &Self) -> Reconciled<Self>;
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// A customer order (`srid`).
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub credential_id: CredentialId,
    pub srid: String,
    pub last_change_date: DateTime<Utc>,
    pub date: Option<DateTime<Utc>>,
    pub warehouse_name: Option<String>,
    pub region_name: Option<String>,
    pub subject: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub nm_id: Option<NmId>,
    pub brand: Option<String>,
    pub price_with_disc: Decimal,
    pub total_price: Decimal,
    pub spp: Decimal,
    pub is_cancel: bool,
}

impl Tracked for Order {
    type Key = String;

    fn credential_id(&self) -> CredentialId {
        self.credential_id
    }

    fn key(&self) -> String {
        self.srid.clone()
    }

    fn changed_at(&self) -> DateTime<Utc> {
        self.last_change_date
    }

    fn reconcile(stored: &Self, incoming: &Self) -> Reconciled<Self> {
        let mut merged = stored.clone();
        let changed = incoming.last_change_date > stored.last_change_date;
        if changed {
            merged.last_change_date = incoming.last_change_date;
            merged.is_cancel = incoming.is_cancel;
        }

        let mut backfilled = false;
        if is_blank(&merged.supplier_article) && !is_blank(&incoming.supplier_article) {
            merged.supplier_article = incoming.supplier_article.clone();
            backfilled = true;
        }
        if is_blank(&merged.tech_size) && !is_blank(&incoming.tech_size) {
            merged.tech_size = incoming.tech_size.clone();
            backfilled = true;
        }

        if changed {
            Reconciled::Changed(merged)
        } else if backfilled {
            Reconciled::Backfilled(merged)
        } else {
            Reconciled::Unchanged
        }
    }
}

/// A completed purchase (`saleID`).
#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub credential_id: CredentialId,
    pub sale_id: String,
    pub last_change_date: DateTime<Utc>,
    pub date: Option<DateTime<Utc>>,
    pub warehouse_name: Option<String>,
    pub region_name: Option<String>,
    pub subject: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub nm_id: Option<NmId>,
    pub brand: Option<String>,
    pub price_with_disc: Decimal,
    pub total_price: Decimal,
    pub spp: Decimal,
}

impl Tracked for Sale {
    type Key = String;

    fn credential_id(&self) -> CredentialId {
        self.credential_id
    }

    fn key(&self) -> String {
        self.sale_id.clone()
    }

    fn changed_at(&self) -> DateTime<Utc> {
        self.last_change_date
    }

    fn reconcile(stored: &Self, incoming: &Self) -> Reconciled<Self> {
        if incoming.last_change_date > stored.last_change_date {
            let mut merged = stored.clone();
            merged.last_change_date = incoming.last_change_date;
            Reconciled::Changed(merged)
        } else {
            Reconciled::Unchanged
        }
    }
}

/// Stock of one article at one warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct StockLevel {
    pub credential_id: CredentialId,
    pub nm_id: NmId,
    pub warehouse_name: String,
    pub last_change_date: DateTime<Utc>,
    pub quantity: i32,
    pub quantity_full: Option<i32>,
    pub in_way_to_client: Option<i32>,
    pub subject: Option<String>,
}

impl Tracked for StockLevel {
    type Key = (NmId, String);

    fn credential_id(&self) -> CredentialId {
        self.credential_id
    }

    fn key(&self) -> (NmId, String) {
        (self.nm_id, self.warehouse_name.clone())
    }

    fn changed_at(&self) -> DateTime<Utc> {
        self.last_change_date
    }

    fn reconcile(stored: &Self, incoming: &Self) -> Reconciled<Self> {
        if incoming.last_change_date > stored.last_change_date {
            let mut merged = stored.clone();
            merged.last_change_date = incoming.last_change_date;
            merged.quantity = incoming.quantity;
            merged.quantity_full = incoming.quantity_full;
            merged.in_way_to_client = incoming.in_way_to_client;
            Reconciled::Changed(merged)
        } else {
            Reconciled::Unchanged
        }
    }
}

/// One line of a supply delivered to a marketplace warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct Income {
    pub credential_id: CredentialId,
    pub income_id: i64,
    pub nm_id: NmId,
    pub number: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub last_change_date: DateTime<Utc>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub barcode: Option<String>,
    pub quantity: i32,
    pub total_price: Decimal,
    pub date_close: Option<DateTime<Utc>>,
    pub warehouse_name: Option<String>,
    pub status: Option<String>,
}

impl Tracked for Income {
    type Key = (i64, NmId);

    fn credential_id(&self) -> CredentialId {
        self.credential_id
    }

    fn key(&self) -> (i64, NmId) {
        (self.income_id, self.nm_id)
    }

    fn changed_at(&self) -> DateTime<Utc> {
        self.last_change_date
    }

    fn reconcile(stored: &Self, incoming: &Self) -> Reconciled<Self> {
        if incoming.last_change_date > stored.last_change_date {
            let mut merged = stored.clone();
            merged.last_change_date = incoming.last_change_date;
            if incoming.status.is_some() {
                merged.status = incoming.status.clone();
            }
            Reconciled::Changed(merged)
        } else {
            Reconciled::Unchanged
        }
    }
}

/// Warehouse acceptance cost multiplier for one box type on one day.
///
/// A coefficient of zero means the warehouse accepts supplies for free.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptanceCoefficient {
    pub credential_id: CredentialId,
    pub warehouse_id: WarehouseId,
    pub warehouse_name: Option<String>,
    pub box_type_id: i64,
    pub box_type_name: Option<String>,
    pub date: DateTime<Utc>,
    pub coefficient: f64,
    pub allow_unload: bool,
    pub storage_coef: Option<f64>,
    pub delivery_coef: Option<f64>,
    pub is_sorting_center: bool,
    /// When this value was last observed to change.
    pub observed_at: DateTime<Utc>,
}

impl AcceptanceCoefficient {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.coefficient == 0.0
    }
}

impl Tracked for AcceptanceCoefficient {
    type Key = (WarehouseId, i64, DateTime<Utc>);

    fn credential_id(&self) -> CredentialId {
        self.credential_id
    }

    fn key(&self) -> Self::Key {
        (self.warehouse_id, self.box_type_id, self.date)
    }

    fn changed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn reconcile(stored: &Self, incoming: &Self) -> Reconciled<Self> {
        let coefficient_moved = (stored.coefficient - incoming.coefficient).abs() > f64::EPSILON;
        if coefficient_moved || stored.allow_unload != incoming.allow_unload {
            let mut merged = stored.clone();
            merged.coefficient = incoming.coefficient;
            merged.allow_unload = incoming.allow_unload;
            merged.observed_at = incoming.observed_at;
            Reconciled::Changed(merged)
        } else {
            Reconciled::Unchanged
        }
    }
}

/// One row of the realization report, kept for logistics and commission
/// figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub credential_id: CredentialId,
    pub rrd_id: i64,
    pub create_dt: Option<DateTime<Utc>>,
    pub order_dt: Option<DateTime<Utc>>,
    pub subject_name: String,
    pub nm_id: NmId,
    pub brand_name: Option<String>,
    pub quantity: i32,
    pub retail_price: Decimal,
    pub retail_amount: Decimal,
    pub office_name: Option<String>,
    pub delivery_amount: i32,
    pub return_amount: i32,
    pub delivery_rub: Decimal,
    pub commission_percent: Decimal,
}

/// A detected change, decoupled from persistence rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangedRecord {
    Order(Order),
    Sale(Sale),
    Stock(StockLevel),
    Income(Income),
    Coefficient(AcceptanceCoefficient),
}

impl ChangedRecord {
    #[must_use]
    pub fn credential_id(&self) -> CredentialId {
        match self {
            Self::Order(r) => r.credential_id,
            Self::Sale(r) => r.credential_id,
            Self::Stock(r) => r.credential_id,
            Self::Income(r) => r.credential_id,
            Self::Coefficient(r) => r.credential_id,
        }
    }
}

macro_rules! into_changed {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for ChangedRecord {
            fn from(record: $ty) -> Self {
                Self::$variant(record)
            }
        })*
    };
}

into_changed!(
    Order(Order),
    Sale(Sale),
    Stock(StockLevel),
    Income(Income),
    Coefficient(AcceptanceCoefficient),
);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn order(srid: &str, changed: DateTime<Utc>) -> Order {
        Order {
            credential_id: CredentialId::new(1),
            srid: srid.into(),
            last_change_date: changed,
            date: Some(changed),
            warehouse_name: Some("Коледино".into()),
            region_name: Some("Московская".into()),
            subject: Some("Футболка".into()),
            supplier_article: Some("FT-01".into()),
            tech_size: Some("M".into()),
            nm_id: Some(NmId::new(100)),
            brand: None,
            price_with_disc: dec!(1000),
            total_price: dec!(1200),
            spp: dec!(10),
            is_cancel: false,
        }
    }

    // ------------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------------

    #[test]
    fn same_timestamp_is_unchanged() {
        let t1 = Utc::now();
        let stored = order("S100", t1);
        assert_eq!(Order::reconcile(&stored, &stored.clone()), Reconciled::Unchanged);
    }

    #[test]
    fn newer_timestamp_updates_cancel_flag() {
        let t1 = Utc::now();
        let stored = order("S100", t1);
        let mut incoming = order("S100", t1 + Duration::minutes(5));
        incoming.is_cancel = true;

        match Order::reconcile(&stored, &incoming) {
            Reconciled::Changed(merged) => {
                assert!(merged.is_cancel);
                assert_eq!(merged.last_change_date, incoming.last_change_date);
            }
            other => panic!("expected change, got {other:?}"),
        }
    }

    #[test]
    fn older_timestamp_never_regresses() {
        let t1 = Utc::now();
        let stored = order("S100", t1);
        let mut incoming = order("S100", t1 - Duration::minutes(5));
        incoming.is_cancel = true;
        assert_eq!(Order::reconcile(&stored, &incoming), Reconciled::Unchanged);
    }

    #[test]
    fn blank_article_is_backfilled_without_change() {
        let t1 = Utc::now();
        let mut stored = order("S100", t1);
        stored.supplier_article = Some(String::new());
        stored.tech_size = None;
        let incoming = order("S100", t1);

        match Order::reconcile(&stored, &incoming) {
            Reconciled::Backfilled(merged) => {
                assert_eq!(merged.supplier_article.as_deref(), Some("FT-01"));
                assert_eq!(merged.tech_size.as_deref(), Some("M"));
            }
            other => panic!("expected backfill, got {other:?}"),
        }
    }

    // ------------------------------------------------------------------------
    // Acceptance coefficients
    // ------------------------------------------------------------------------

    fn coefficient(value: f64, allow_unload: bool) -> AcceptanceCoefficient {
        let now = Utc::now();
        AcceptanceCoefficient {
            credential_id: CredentialId::new(1),
            warehouse_id: WarehouseId::new(507),
            warehouse_name: Some("Коледино".into()),
            box_type_id: 2,
            box_type_name: Some("Короба".into()),
            date: now,
            coefficient: value,
            allow_unload,
            storage_coef: None,
            delivery_coef: None,
            is_sorting_center: false,
            observed_at: now,
        }
    }

    #[test]
    fn coefficient_change_detected_by_value_or_unload_flag() {
        let stored = coefficient(1.0, true);
        assert!(matches!(
            AcceptanceCoefficient::reconcile(&stored, &coefficient(0.0, true)),
            Reconciled::Changed(_)
        ));
        assert!(matches!(
            AcceptanceCoefficient::reconcile(&stored, &coefficient(1.0, false)),
            Reconciled::Changed(_)
        ));
        assert_eq!(
            AcceptanceCoefficient::reconcile(&stored, &coefficient(1.0, true)),
            Reconciled::Unchanged
        );
    }

    #[test]
    fn zero_coefficient_is_free() {
        assert!(coefficient(0.0, true).is_free());
        assert!(!coefficient(-1.0, true).is_free());
    }

    #[test]
    fn changed_record_reports_credential() {
        let record: ChangedRecord = order("S1", Utc::now()).into();
        assert_eq!(record.credential_id(), CredentialId::new(1));
    }
}
