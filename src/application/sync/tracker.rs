//! Per-domain fetch, normalization and merge rules.
//!
//! A [`Tracker`] tells the generic poller how to read one statistics
//! domain: which endpoint to call, how to turn a raw row into a tracked
//! record, and which store operation merges a batch.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use rust_decimal::Decimal;

use crate::domain::time::parse_timestamp;
use crate::domain::{
    AcceptanceCoefficient, ChangedRecord, CredentialId, Income, NmId, Order, ProductSeed, Sale,
    StockLevel, Tracked, WarehouseId,
};
use crate::error::Result;
use crate::port::outbound::gateway::{
    GatewayResult, RawCoefficient, RawIncome, RawOrder, RawSale, RawStock, StatisticsGateway,
};
use crate::port::outbound::store::RecordStore;

/// A polled statistics domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncDomain {
    Orders,
    Sales,
    Stocks,
    Incomes,
    Coefficients,
}

impl SyncDomain {
    pub const ALL: [SyncDomain; 5] = [
        SyncDomain::Orders,
        SyncDomain::Sales,
        SyncDomain::Stocks,
        SyncDomain::Incomes,
        SyncDomain::Coefficients,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Sales => "sales",
            Self::Stocks => "stocks",
            Self::Incomes => "incomes",
            Self::Coefficients => "coefficients",
        }
    }
}

impl fmt::Display for SyncDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDomain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.as_str() == s)
            .ok_or_else(|| format!("unknown sync domain: {s}"))
    }
}

/// Context for normalizing one credential's rows.
#[derive(Debug, Clone, Copy)]
pub struct Normalize {
    pub credential_id: CredentialId,
    /// Substituted for an unparseable change timestamp.
    pub fallback: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl Normalize {
    fn changed_at(&self, raw: Option<&str>) -> DateTime<Utc> {
        raw.and_then(parse_timestamp).unwrap_or(self.fallback)
    }
}

pub trait Tracker: Send + Sync + 'static {
    type Raw: Send + 'static;
    type Record: Tracked + Into<ChangedRecord>;

    const DOMAIN: SyncDomain;

    fn fetch<'a>(
        gateway: &'a dyn StatisticsGateway,
        credential: &'a str,
        since: DateTime<Utc>,
    ) -> BoxFuture<'a, GatewayResult<Vec<Self::Raw>>>;

    /// `None` when the row lacks its natural key.
    fn normalize(raw: Self::Raw, ctx: &Normalize) -> Option<Self::Record>;

    fn merge<S: RecordStore>(
        store: &S,
        batch: Vec<Self::Record>,
    ) -> impl Future<Output = Result<Vec<Self::Record>>> + Send;

    /// Catalog article and descriptive fields, for first-sighting upserts.
    fn seed(_record: &Self::Record) -> Option<(NmId, ProductSeed)> {
        None
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn money(value: Option<Decimal>) -> Decimal {
    value.unwrap_or_default()
}

pub struct OrdersTracker;

impl Tracker for OrdersTracker {
    type Raw = RawOrder;
    type Record = Order;

    const DOMAIN: SyncDomain = SyncDomain::Orders;

    fn fetch<'a>(
        gateway: &'a dyn StatisticsGateway,
        credential: &'a str,
        since: DateTime<Utc>,
    ) -> BoxFuture<'a, GatewayResult<Vec<RawOrder>>> {
        gateway.orders(credential, since)
    }

    fn normalize(raw: RawOrder, ctx: &Normalize) -> Option<Order> {
        let srid = non_blank(raw.srid)?;
        Some(Order {
            credential_id: ctx.credential_id,
            srid,
            last_change_date: ctx.changed_at(raw.last_change_date.as_deref()),
            date: raw.date.as_deref().and_then(parse_timestamp),
            warehouse_name: raw.warehouse_name,
            region_name: raw.region_name,
            subject: raw.subject,
            supplier_article: raw.supplier_article,
            tech_size: raw.tech_size,
            nm_id: raw.nm_id.map(NmId::new),
            brand: raw.brand,
            price_with_disc: money(raw.price_with_disc),
            total_price: money(raw.total_price),
            spp: money(raw.spp),
            is_cancel: raw.is_cancel,
        })
    }

    fn merge<S: RecordStore>(
        store: &S,
        batch: Vec<Order>,
    ) -> impl Future<Output = Result<Vec<Order>>> + Send {
        store.merge_orders(batch)
    }

    fn seed(order: &Order) -> Option<(NmId, ProductSeed)> {
        let nm_id = order.nm_id?;
        Some((
            nm_id,
            ProductSeed {
                subject_name: order.subject.clone(),
                brand_name: order.brand.clone(),
                supplier_article: order.supplier_article.clone(),
                tech_size: order.tech_size.clone(),
            },
        ))
    }
}

pub struct SalesTracker;

impl Tracker for SalesTracker {
    type Raw = RawSale;
    type Record = Sale;

    const DOMAIN: SyncDomain = SyncDomain::Sales;

    fn fetch<'a>(
        gateway: &'a dyn StatisticsGateway,
        credential: &'a str,
        since: DateTime<Utc>,
    ) -> BoxFuture<'a, GatewayResult<Vec<RawSale>>> {
        gateway.sales(credential, since)
    }

    fn normalize(raw: RawSale, ctx: &Normalize) -> Option<Sale> {
        let sale_id = non_blank(raw.sale_id)?;
        Some(Sale {
            credential_id: ctx.credential_id,
            sale_id,
            last_change_date: ctx.changed_at(raw.last_change_date.as_deref()),
            date: raw.date.as_deref().and_then(parse_timestamp),
            warehouse_name: raw.warehouse_name,
            region_name: raw.region_name,
            subject: raw.subject,
            supplier_article: raw.supplier_article,
            tech_size: raw.tech_size,
            nm_id: raw.nm_id.map(NmId::new),
            brand: raw.brand,
            price_with_disc: money(raw.price_with_disc),
            total_price: money(raw.total_price),
            spp: money(raw.spp),
        })
    }

    fn merge<S: RecordStore>(
        store: &S,
        batch: Vec<Sale>,
    ) -> impl Future<Output = Result<Vec<Sale>>> + Send {
        store.merge_sales(batch)
    }

    fn seed(sale: &Sale) -> Option<(NmId, ProductSeed)> {
        let nm_id = sale.nm_id?;
        Some((
            nm_id,
            ProductSeed {
                subject_name: sale.subject.clone(),
                brand_name: sale.brand.clone(),
                supplier_article: sale.supplier_article.clone(),
                tech_size: sale.tech_size.clone(),
            },
        ))
    }
}

pub struct StocksTracker;

impl Tracker for StocksTracker {
    type Raw = RawStock;
    type Record = StockLevel;

    const DOMAIN: SyncDomain = SyncDomain::Stocks;

    fn fetch<'a>(
        gateway: &'a dyn StatisticsGateway,
        credential: &'a str,
        since: DateTime<Utc>,
    ) -> BoxFuture<'a, GatewayResult<Vec<RawStock>>> {
        gateway.stocks(credential, since)
    }

    fn normalize(raw: RawStock, ctx: &Normalize) -> Option<StockLevel> {
        let nm_id = NmId::new(raw.nm_id?);
        let warehouse_name = non_blank(raw.warehouse_name)?;
        Some(StockLevel {
            credential_id: ctx.credential_id,
            nm_id,
            warehouse_name,
            last_change_date: ctx.changed_at(raw.last_change_date.as_deref()),
            quantity: raw.quantity.unwrap_or(0),
            quantity_full: raw.quantity_full,
            in_way_to_client: raw.in_way_to_client,
            subject: raw.subject,
        })
    }

    fn merge<S: RecordStore>(
        store: &S,
        batch: Vec<StockLevel>,
    ) -> impl Future<Output = Result<Vec<StockLevel>>> + Send {
        store.merge_stocks(batch)
    }

    fn seed(stock: &StockLevel) -> Option<(NmId, ProductSeed)> {
        Some((
            stock.nm_id,
            ProductSeed {
                subject_name: stock.subject.clone(),
                ..ProductSeed::default()
            },
        ))
    }
}

pub struct IncomesTracker;

impl Tracker for IncomesTracker {
    type Raw = RawIncome;
    type Record = Income;

    const DOMAIN: SyncDomain = SyncDomain::Incomes;

    fn fetch<'a>(
        gateway: &'a dyn StatisticsGateway,
        credential: &'a str,
        since: DateTime<Utc>,
    ) -> BoxFuture<'a, GatewayResult<Vec<RawIncome>>> {
        gateway.incomes(credential, since)
    }

    fn normalize(raw: RawIncome, ctx: &Normalize) -> Option<Income> {
        let income_id = raw.income_id?;
        let nm_id = NmId::new(raw.nm_id?);
        Some(Income {
            credential_id: ctx.credential_id,
            income_id,
            nm_id,
            number: raw.number,
            date: raw.date.as_deref().and_then(parse_timestamp),
            last_change_date: ctx.changed_at(raw.last_change_date.as_deref()),
            supplier_article: raw.supplier_article,
            tech_size: raw.tech_size,
            barcode: raw.barcode,
            quantity: raw.quantity.unwrap_or(0),
            total_price: money(raw.total_price),
            date_close: raw.date_close.as_deref().and_then(parse_timestamp),
            warehouse_name: raw.warehouse_name,
            status: raw.status,
        })
    }

    fn merge<S: RecordStore>(
        store: &S,
        batch: Vec<Income>,
    ) -> impl Future<Output = Result<Vec<Income>>> + Send {
        store.merge_incomes(batch)
    }
}

pub struct CoefficientsTracker;

impl Tracker for CoefficientsTracker {
    type Raw = RawCoefficient;
    type Record = AcceptanceCoefficient;

    const DOMAIN: SyncDomain = SyncDomain::Coefficients;

    fn fetch<'a>(
        gateway: &'a dyn StatisticsGateway,
        credential: &'a str,
        _since: DateTime<Utc>,
    ) -> BoxFuture<'a, GatewayResult<Vec<RawCoefficient>>> {
        gateway.acceptance_coefficients(credential)
    }

    fn normalize(raw: RawCoefficient, ctx: &Normalize) -> Option<AcceptanceCoefficient> {
        let warehouse_id = WarehouseId::new(raw.warehouse_id?);
        let box_type_id = raw.box_type_id?;
        let date = raw.date.as_deref().and_then(parse_timestamp)?;
        let coefficient = raw.coefficient?;
        Some(AcceptanceCoefficient {
            credential_id: ctx.credential_id,
            warehouse_id,
            warehouse_name: raw.warehouse_name,
            box_type_id,
            box_type_name: raw.box_type_name,
            date,
            coefficient,
            allow_unload: raw.allow_unload.unwrap_or(false),
            storage_coef: raw.storage_coef,
            delivery_coef: raw.delivery_coef,
            is_sorting_center: raw.is_sorting_center,
            observed_at: ctx.now,
        })
    }

    fn merge<S: RecordStore>(
        store: &S,
        batch: Vec<AcceptanceCoefficient>,
    ) -> impl Future<Output = Result<Vec<AcceptanceCoefficient>>> + Send {
        store.merge_coefficients(batch)
    }
}
