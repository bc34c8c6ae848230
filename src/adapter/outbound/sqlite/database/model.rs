//! Database row types and their conversions to domain values.
//!
//! Timestamps are stored as fixed-width RFC 3339 text in UTC so that string
//! comparison orders them correctly. Money is stored as `DOUBLE`.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::schema::{
    acceptance_coefficients, incomes, orders, payments, products, report_details, sales, stocks,
    tokens, users,
};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::{
    AcceptanceCoefficient, Credential, CredentialId, Income, NmId, NotificationSettings, Order,
    PaymentId, Product, ReportLine, Role, Sale, StockLevel, TelegramId, User, UserId, WarehouseId,
};
use crate::error::{Error, Result};

/// Format a timestamp for storage.
#[must_use]
pub fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp.
pub fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("bad timestamp {value:?}: {e}")))
}

fn parse_opt_ts(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_ts).transpose()
}

/// Store a decimal in a money column.
#[must_use]
pub fn money(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Read a stored money column back as a decimal rounded to kopecks.
#[must_use]
pub fn decimal(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .unwrap_or_default()
}

/// Row id of the last insert on this connection.
#[derive(QueryableByName, Debug)]
pub struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub id: i32,
}

/// `SELECT last_insert_rowid()` on the connection running the insert.
pub fn last_insert_rowid(conn: &mut SqliteConnection) -> QueryResult<i32> {
    diesel::sql_query("SELECT last_insert_rowid() AS id")
        .get_result::<LastInsertRowId>(conn)
        .map(|row| row.id)
}

// ----------------------------------------------------------------------------
// Credentials and users
// ----------------------------------------------------------------------------

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = tokens)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TokenRow {
    pub id: i32,
    pub value: String,
    pub role: String,
    pub subscription_until: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tokens)]
pub struct NewTokenRow {
    pub value: String,
    pub role: String,
    pub subscription_until: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl TryFrom<TokenRow> for Credential {
    type Error = Error;

    fn try_from(row: TokenRow) -> Result<Self> {
        Ok(Self {
            id: CredentialId::new(row.id),
            value: row.value,
            role: Role::from_stored(Some(&row.role)),
            subscription_until: parse_opt_ts(row.subscription_until)?,
            is_active: row.is_active,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: i32,
    pub telegram_id: i64,
    pub token_id: Option<i32>,
    pub subscription_until: Option<String>,
    pub store_link: Option<String>,
    pub notify_orders: bool,
    pub notify_sales: bool,
    pub notify_daily_report: bool,
    pub notify_incomes: bool,
    pub notify_cancel: bool,
    pub created_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub telegram_id: i64,
    pub created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: UserId::new(row.id),
            telegram_id: TelegramId::new(row.telegram_id),
            credential_id: row.token_id.map(CredentialId::new),
            subscription_until: parse_opt_ts(row.subscription_until)?,
            store_link: row.store_link,
            notify: NotificationSettings {
                orders: row.notify_orders,
                sales: row.notify_sales,
                daily_report: row.notify_daily_report,
                incomes: row.notify_incomes,
                cancellations: row.notify_cancel,
            },
        })
    }
}

// ----------------------------------------------------------------------------
// Tracked records
// ----------------------------------------------------------------------------

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub token_id: i32,
    pub srid: String,
    pub last_change_date: String,
    pub date: Option<String>,
    pub warehouse_name: Option<String>,
    pub region_name: Option<String>,
    pub subject: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub nm_id: Option<i64>,
    pub brand: Option<String>,
    pub price_with_disc: f64,
    pub total_price: f64,
    pub spp: f64,
    pub is_cancel: bool,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            token_id: order.credential_id.get(),
            srid: order.srid.clone(),
            last_change_date: ts(order.last_change_date),
            date: order.date.map(ts),
            warehouse_name: order.warehouse_name.clone(),
            region_name: order.region_name.clone(),
            subject: order.subject.clone(),
            supplier_article: order.supplier_article.clone(),
            tech_size: order.tech_size.clone(),
            nm_id: order.nm_id.map(NmId::get),
            brand: order.brand.clone(),
            price_with_disc: money(order.price_with_disc),
            total_price: money(order.total_price),
            spp: money(order.spp),
            is_cancel: order.is_cancel,
        }
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = Error;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Self {
            credential_id: CredentialId::new(row.token_id),
            last_change_date: parse_ts(&row.last_change_date)?,
            date: parse_opt_ts(row.date)?,
            srid: row.srid,
            warehouse_name: row.warehouse_name,
            region_name: row.region_name,
            subject: row.subject,
            supplier_article: row.supplier_article,
            tech_size: row.tech_size,
            nm_id: row.nm_id.map(NmId::new),
            brand: row.brand,
            price_with_disc: decimal(row.price_with_disc),
            total_price: decimal(row.total_price),
            spp: decimal(row.spp),
            is_cancel: row.is_cancel,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = sales)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SaleRow {
    pub token_id: i32,
    pub sale_id: String,
    pub last_change_date: String,
    pub date: Option<String>,
    pub warehouse_name: Option<String>,
    pub region_name: Option<String>,
    pub subject: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub nm_id: Option<i64>,
    pub brand: Option<String>,
    pub price_with_disc: f64,
    pub total_price: f64,
    pub spp: f64,
}

impl From<&Sale> for SaleRow {
    fn from(sale: &Sale) -> Self {
        Self {
            token_id: sale.credential_id.get(),
            sale_id: sale.sale_id.clone(),
            last_change_date: ts(sale.last_change_date),
            date: sale.date.map(ts),
            warehouse_name: sale.warehouse_name.clone(),
            region_name: sale.region_name.clone(),
            subject: sale.subject.clone(),
            supplier_article: sale.supplier_article.clone(),
            tech_size: sale.tech_size.clone(),
            nm_id: sale.nm_id.map(NmId::get),
            brand: sale.brand.clone(),
            price_with_disc: money(sale.price_with_disc),
            total_price: money(sale.total_price),
            spp: money(sale.spp),
        }
    }
}

impl TryFrom<SaleRow> for Sale {
    type Error = Error;

    fn try_from(row: SaleRow) -> Result<Self> {
        Ok(Self {
            credential_id: CredentialId::new(row.token_id),
            last_change_date: parse_ts(&row.last_change_date)?,
            date: parse_opt_ts(row.date)?,
            sale_id: row.sale_id,
            warehouse_name: row.warehouse_name,
            region_name: row.region_name,
            subject: row.subject,
            supplier_article: row.supplier_article,
            tech_size: row.tech_size,
            nm_id: row.nm_id.map(NmId::new),
            brand: row.brand,
            price_with_disc: decimal(row.price_with_disc),
            total_price: decimal(row.total_price),
            spp: decimal(row.spp),
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = stocks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StockRow {
    pub token_id: i32,
    pub nm_id: i64,
    pub warehouse_name: String,
    pub last_change_date: String,
    pub quantity: i32,
    pub quantity_full: Option<i32>,
    pub in_way_to_client: Option<i32>,
    pub subject: Option<String>,
}

impl From<&StockLevel> for StockRow {
    fn from(stock: &StockLevel) -> Self {
        Self {
            token_id: stock.credential_id.get(),
            nm_id: stock.nm_id.get(),
            warehouse_name: stock.warehouse_name.clone(),
            last_change_date: ts(stock.last_change_date),
            quantity: stock.quantity,
            quantity_full: stock.quantity_full,
            in_way_to_client: stock.in_way_to_client,
            subject: stock.subject.clone(),
        }
    }
}

impl TryFrom<StockRow> for StockLevel {
    type Error = Error;

    fn try_from(row: StockRow) -> Result<Self> {
        Ok(Self {
            credential_id: CredentialId::new(row.token_id),
            nm_id: NmId::new(row.nm_id),
            last_change_date: parse_ts(&row.last_change_date)?,
            warehouse_name: row.warehouse_name,
            quantity: row.quantity,
            quantity_full: row.quantity_full,
            in_way_to_client: row.in_way_to_client,
            subject: row.subject,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = incomes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IncomeRow {
    pub token_id: i32,
    pub income_id: i64,
    pub nm_id: i64,
    pub number: Option<String>,
    pub date: Option<String>,
    pub last_change_date: String,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub barcode: Option<String>,
    pub quantity: i32,
    pub total_price: f64,
    pub date_close: Option<String>,
    pub warehouse_name: Option<String>,
    pub status: Option<String>,
}

impl From<&Income> for IncomeRow {
    fn from(income: &Income) -> Self {
        Self {
            token_id: income.credential_id.get(),
            income_id: income.income_id,
            nm_id: income.nm_id.get(),
            number: income.number.clone(),
            date: income.date.map(ts),
            last_change_date: ts(income.last_change_date),
            supplier_article: income.supplier_article.clone(),
            tech_size: income.tech_size.clone(),
            barcode: income.barcode.clone(),
            quantity: income.quantity,
            total_price: money(income.total_price),
            date_close: income.date_close.map(ts),
            warehouse_name: income.warehouse_name.clone(),
            status: income.status.clone(),
        }
    }
}

impl TryFrom<IncomeRow> for Income {
    type Error = Error;

    fn try_from(row: IncomeRow) -> Result<Self> {
        Ok(Self {
            credential_id: CredentialId::new(row.token_id),
            income_id: row.income_id,
            nm_id: NmId::new(row.nm_id),
            number: row.number,
            date: parse_opt_ts(row.date)?,
            last_change_date: parse_ts(&row.last_change_date)?,
            supplier_article: row.supplier_article,
            tech_size: row.tech_size,
            barcode: row.barcode,
            quantity: row.quantity,
            total_price: decimal(row.total_price),
            date_close: parse_opt_ts(row.date_close)?,
            warehouse_name: row.warehouse_name,
            status: row.status,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = acceptance_coefficients)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CoefficientRow {
    pub token_id: i32,
    pub warehouse_id: i64,
    pub warehouse_name: Option<String>,
    pub box_type_id: i64,
    pub box_type_name: Option<String>,
    pub date: String,
    pub coefficient: f64,
    pub allow_unload: bool,
    pub storage_coef: Option<f64>,
    pub delivery_coef: Option<f64>,
    pub is_sorting_center: bool,
    pub observed_at: String,
}

impl From<&AcceptanceCoefficient> for CoefficientRow {
    fn from(c: &AcceptanceCoefficient) -> Self {
        Self {
            token_id: c.credential_id.get(),
            warehouse_id: c.warehouse_id.get(),
            warehouse_name: c.warehouse_name.clone(),
            box_type_id: c.box_type_id,
            box_type_name: c.box_type_name.clone(),
            date: ts(c.date),
            coefficient: c.coefficient,
            allow_unload: c.allow_unload,
            storage_coef: c.storage_coef,
            delivery_coef: c.delivery_coef,
            is_sorting_center: c.is_sorting_center,
            observed_at: ts(c.observed_at),
        }
    }
}

impl TryFrom<CoefficientRow> for AcceptanceCoefficient {
    type Error = Error;

    fn try_from(row: CoefficientRow) -> Result<Self> {
        Ok(Self {
            credential_id: CredentialId::new(row.token_id),
            warehouse_id: WarehouseId::new(row.warehouse_id),
            warehouse_name: row.warehouse_name,
            box_type_id: row.box_type_id,
            box_type_name: row.box_type_name,
            date: parse_ts(&row.date)?,
            coefficient: row.coefficient,
            allow_unload: row.allow_unload,
            storage_coef: row.storage_coef,
            delivery_coef: row.delivery_coef,
            is_sorting_center: row.is_sorting_center,
            observed_at: parse_ts(&row.observed_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = report_details)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReportDetailRow {
    pub token_id: i32,
    pub rrd_id: i64,
    pub create_dt: Option<String>,
    pub order_dt: Option<String>,
    pub subject_name: String,
    pub nm_id: i64,
    pub brand_name: Option<String>,
    pub quantity: i32,
    pub retail_price: f64,
    pub retail_amount: f64,
    pub office_name: Option<String>,
    pub delivery_amount: i32,
    pub return_amount: i32,
    pub delivery_rub: f64,
    pub commission_percent: f64,
}

impl From<&ReportLine> for ReportDetailRow {
    fn from(line: &ReportLine) -> Self {
        Self {
            token_id: line.credential_id.get(),
            rrd_id: line.rrd_id,
            create_dt: line.create_dt.map(ts),
            order_dt: line.order_dt.map(ts),
            subject_name: line.subject_name.clone(),
            nm_id: line.nm_id.get(),
            brand_name: line.brand_name.clone(),
            quantity: line.quantity,
            retail_price: money(line.retail_price),
            retail_amount: money(line.retail_amount),
            office_name: line.office_name.clone(),
            delivery_amount: line.delivery_amount,
            return_amount: line.return_amount,
            delivery_rub: money(line.delivery_rub),
            commission_percent: money(line.commission_percent),
        }
    }
}

// ----------------------------------------------------------------------------
// Products and payments
// ----------------------------------------------------------------------------

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductRow {
    pub nm_id: i64,
    pub owner_token_id: i32,
    pub subject_name: Option<String>,
    pub brand_name: Option<String>,
    pub supplier_article: Option<String>,
    pub tech_size: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub thumbnail: Option<Vec<u8>>,
    pub last_update: String,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            nm_id: product.nm_id.get(),
            owner_token_id: product.owner_credential_id.get(),
            subject_name: product.subject_name.clone(),
            brand_name: product.brand_name.clone(),
            supplier_article: product.supplier_article.clone(),
            tech_size: product.tech_size.clone(),
            image_url: product.image_url.clone(),
            rating: product.rating,
            reviews: product.reviews,
            thumbnail: product.thumbnail.clone(),
            last_update: ts(product.last_update),
        }
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = Error;

    fn try_from(row: ProductRow) -> Result<Self> {
        Ok(Self {
            nm_id: NmId::new(row.nm_id),
            owner_credential_id: CredentialId::new(row.owner_token_id),
            subject_name: row.subject_name,
            brand_name: row.brand_name,
            supplier_article: row.supplier_article,
            tech_size: row.tech_size,
            image_url: row.image_url,
            rating: row.rating,
            reviews: row.reviews,
            thumbnail: row.thumbnail,
            last_update: parse_ts(&row.last_update)?,
        })
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PaymentRow {
    pub id: i32,
    pub user_id: i32,
    pub token_id: i32,
    pub tariff: String,
    pub amount: f64,
    pub currency: String,
    pub provider_payment_id: Option<String>,
    pub status: String,
    pub created_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub user_id: i32,
    pub token_id: i32,
    pub tariff: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub created_at: String,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = Error;

    fn try_from(row: PaymentRow) -> Result<Self> {
        Ok(Self {
            id: PaymentId::new(row.id),
            user_id: UserId::new(row.user_id),
            credential_id: CredentialId::new(row.token_id),
            tariff: row.tariff,
            amount: decimal(row.amount),
            currency: row.currency,
            provider_payment_id: row.provider_payment_id,
            status: row.status.parse::<PaymentStatus>().map_err(Error::Parse)?,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn stored_timestamps_sort_lexicographically() {
        let early = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        assert!(ts(early) < ts(late));
        assert_eq!(parse_ts(&ts(late)).unwrap(), late);
    }

    #[test]
    fn money_survives_double_column() {
        assert_eq!(decimal(money(dec!(349.00))), dec!(349.00));
        assert_eq!(decimal(money(dec!(1234.56))), dec!(1234.56));
    }

    #[test]
    fn unknown_role_reads_as_free() {
        let row = TokenRow {
            id: 1,
            value: "x".into(),
            role: "platinum".into(),
            subscription_until: None,
            is_active: true,
            created_at: ts(Utc::now()),
        };
        let credential = Credential::try_from(row).unwrap();
        assert_eq!(credential.role, Role::Free);
    }
}
