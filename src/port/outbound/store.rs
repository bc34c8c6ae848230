//! Persistence ports.
//!
//! The `merge_*` operations apply a whole per-credential batch in one
//! transaction using [`Tracked::reconcile`](crate::domain::Tracked::reconcile)
//! and return only the records that changed.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::metrics::ActivityCounts;
use crate::domain::payment::{NewPayment, Payment, PaymentStatus};
use crate::domain::report::DailySnapshot;
use crate::domain::{
    AcceptanceCoefficient, Credential, CredentialId, Income, NewCredential, NmId,
    NotificationKind, Order, PaymentId, Product, ReportLine, Role, Sale, StockLevel, TelegramId,
    User, UserId, WarehouseId,
};
use crate::error::Result;

/// Storage operations for marketplace credentials.
pub trait CredentialStore: Send + Sync {
    /// Credentials the pollers should visit.
    fn active_credentials(&self) -> impl Future<Output = Result<Vec<Credential>>> + Send;

    fn credential(&self, id: CredentialId)
        -> impl Future<Output = Result<Option<Credential>>> + Send;

    fn credential_by_value(
        &self,
        value: &str,
    ) -> impl Future<Output = Result<Option<Credential>>> + Send;

    fn insert_credential(
        &self,
        credential: &NewCredential,
    ) -> impl Future<Output = Result<Credential>> + Send;

    /// Credentials whose subscription ends in `(now, now + window]`.
    fn expiring_credentials(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> impl Future<Output = Result<Vec<Credential>>> + Send;
}

/// Storage operations for bot users and their subscriptions.
pub trait UserStore: Send + Sync {
    fn user_by_telegram(
        &self,
        telegram_id: TelegramId,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Fetch the user for a chat, creating it with default settings.
    fn ensure_user(&self, telegram_id: TelegramId) -> impl Future<Output = Result<User>> + Send;

    fn bind_credential(
        &self,
        user_id: UserId,
        credential_id: CredentialId,
    ) -> impl Future<Output = Result<()>> + Send;

    fn users_for_credential(
        &self,
        credential_id: CredentialId,
    ) -> impl Future<Output = Result<Vec<User>>> + Send;

    /// Users with a bound credential and the daily report switched on.
    fn daily_report_recipients(&self) -> impl Future<Output = Result<Vec<User>>> + Send;

    fn set_notification(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    fn warehouse_subscriptions(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<WarehouseId>>> + Send;

    /// Returns false when the subscription already existed.
    fn subscribe_warehouse(
        &self,
        user_id: UserId,
        warehouse_id: WarehouseId,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn unsubscribe_warehouse(
        &self,
        user_id: UserId,
        warehouse_id: WarehouseId,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn box_type_subscriptions(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    fn subscribe_box_type(
        &self,
        user_id: UserId,
        box_type: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    fn unsubscribe_box_type(
        &self,
        user_id: UserId,
        box_type: &str,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Storage operations for change-tracked marketplace records.
pub trait RecordStore: Send + Sync {
    fn merge_orders(&self, batch: Vec<Order>) -> impl Future<Output = Result<Vec<Order>>> + Send;

    fn merge_sales(&self, batch: Vec<Sale>) -> impl Future<Output = Result<Vec<Sale>>> + Send;

    fn merge_stocks(
        &self,
        batch: Vec<StockLevel>,
    ) -> impl Future<Output = Result<Vec<StockLevel>>> + Send;

    fn merge_incomes(&self, batch: Vec<Income>)
        -> impl Future<Output = Result<Vec<Income>>> + Send;

    fn merge_coefficients(
        &self,
        batch: Vec<AcceptanceCoefficient>,
    ) -> impl Future<Output = Result<Vec<AcceptanceCoefficient>>> + Send;

    /// Insert report rows, ignoring ones already stored. Returns rows added.
    fn insert_report_lines(
        &self,
        lines: Vec<ReportLine>,
    ) -> impl Future<Output = Result<usize>> + Send;

    /// Non-cancelled orders of an article today and over the trailing window.
    fn order_activity(
        &self,
        credential_id: CredentialId,
        nm_id: NmId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<ActivityCounts>> + Send;

    fn sale_activity(
        &self,
        credential_id: CredentialId,
        nm_id: NmId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<ActivityCounts>> + Send;

    /// Units of an article across all warehouses.
    fn total_stock(
        &self,
        credential_id: CredentialId,
        nm_id: NmId,
    ) -> impl Future<Output = Result<i64>> + Send;

    /// Most recent logistics cost for an article shipped from `office`.
    fn latest_delivery_cost(
        &self,
        credential_id: CredentialId,
        nm_id: NmId,
        office: &str,
    ) -> impl Future<Output = Result<Option<Decimal>>> + Send;

    /// Most recent commission percent charged on a sold unit.
    fn latest_commission(
        &self,
        credential_id: CredentialId,
        nm_id: NmId,
    ) -> impl Future<Output = Result<Option<Decimal>>> + Send;

    fn daily_snapshot(
        &self,
        credential_id: CredentialId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<DailySnapshot>> + Send;

    /// Warehouses seen in acceptance coefficients, by name.
    fn known_warehouses(
        &self,
    ) -> impl Future<Output = Result<Vec<(WarehouseId, String)>>> + Send;
}

/// Storage operations for the product cache.
pub trait ProductStore: Send + Sync {
    fn product(&self, nm_id: NmId) -> impl Future<Output = Result<Option<Product>>> + Send;

    fn upsert_product(&self, product: &Product) -> impl Future<Output = Result<()>> + Send;

    /// Products older than `max_age` or without a rating.
    fn stale_products(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> impl Future<Output = Result<Vec<Product>>> + Send;
}

/// Storage operations for the payment ledger.
pub trait PaymentStore: Send + Sync {
    fn insert_payment(&self, payment: &NewPayment)
        -> impl Future<Output = Result<Payment>> + Send;

    fn payment(&self, id: PaymentId) -> impl Future<Output = Result<Option<Payment>>> + Send;

    fn update_payment(
        &self,
        id: PaymentId,
        provider_payment_id: Option<&str>,
        status: PaymentStatus,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Mark a payment succeeded and apply the subscription atomically.
    ///
    /// The credential gets `role` and is reactivated. Its expiry is
    /// extended by `days` from the later of `now` and the expiry stored at
    /// that moment, and the paying user's copy is synced. Returns the new
    /// expiry, or `None`, changing nothing, when the payment was already
    /// succeeded.
    fn complete_payment(
        &self,
        id: PaymentId,
        role: Role,
        days: i64,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>>> + Send;
}

/// Every storage port, for services that need more than one.
pub trait Store:
    CredentialStore + UserStore + RecordStore + ProductStore + PaymentStore + 'static
{
}

impl<T> Store for T where
    T: CredentialStore + UserStore + RecordStore + ProductStore + PaymentStore + 'static
{
}

/// Outcome of one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub orders_deleted: usize,
    pub sales_deleted: usize,
    pub report_lines_deleted: usize,
    /// True when the time budget ran out before the backlog was cleared.
    pub timed_out: bool,
}

impl RetentionReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.orders_deleted + self.sales_deleted + self.report_lines_deleted
    }
}

/// Blocking bulk deletion of old history. Runs off the async runtime.
pub trait RetentionSweeper: Send + Sync + 'static {
    fn sweep(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: usize,
        budget: std::time::Duration,
    ) -> Result<RetentionReport>;
}
