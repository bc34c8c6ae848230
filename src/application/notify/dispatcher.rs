//! Fan-out of detected changes to subscribed chats.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::format::{self, ArticleFigures};
use crate::domain::{
    AcceptanceCoefficient, ChangedRecord, CredentialId, Income, NmId, NotificationKind, Order,
    Sale, TelegramId, User,
};
use crate::error::Result;
use crate::port::outbound::store::{ProductStore, RecordStore, UserStore};
use crate::port::outbound::transport::ChatTransport;

/// Delivery counters for one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchReport {
    fn record(&mut self, ok: bool) {
        if ok {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Sends one message per (change, user). Send-once and best effort:
/// failures are logged and counted, never retried or propagated.
pub struct Dispatcher<S> {
    store: Arc<S>,
    transport: Arc<dyn ChatTransport>,
}

impl<S> Dispatcher<S>
where
    S: UserStore + RecordStore + ProductStore + 'static,
{
    pub fn new(store: Arc<S>, transport: Arc<dyn ChatTransport>) -> Self {
        Self { store, transport }
    }

    pub async fn notify(&self, records: Vec<ChangedRecord>) -> DispatchReport {
        self.notify_at(records, Utc::now()).await
    }

    pub async fn notify_at(&self, records: Vec<ChangedRecord>, now: DateTime<Utc>) -> DispatchReport {
        let mut grouped: BTreeMap<CredentialId, Vec<ChangedRecord>> = BTreeMap::new();
        for record in records {
            grouped.entry(record.credential_id()).or_default().push(record);
        }

        let mut report = DispatchReport::default();
        for (credential_id, records) in grouped {
            let users = match self.store.users_for_credential(credential_id).await {
                Ok(users) if !users.is_empty() => users,
                Ok(_) => continue,
                Err(e) => {
                    warn!(credential_id = credential_id.get(), error = %e, "failed to resolve users");
                    continue;
                }
            };
            self.notify_credential(credential_id, records, &users, now, &mut report)
                .await;
        }

        if report.delivered + report.failed > 0 {
            info!(
                delivered = report.delivered,
                failed = report.failed,
                "notifications dispatched"
            );
        }
        report
    }

    async fn notify_credential(
        &self,
        credential_id: CredentialId,
        records: Vec<ChangedRecord>,
        users: &[User],
        now: DateTime<Utc>,
        report: &mut DispatchReport,
    ) {
        let mut supplies: BTreeMap<i64, Vec<Income>> = BTreeMap::new();
        let mut free_slots: Vec<AcceptanceCoefficient> = Vec::new();

        for record in records {
            match record {
                ChangedRecord::Order(order) => {
                    self.order(credential_id, &order, users, now, report).await;
                }
                ChangedRecord::Sale(sale) => {
                    self.sale(credential_id, &sale, users, now, report).await;
                }
                ChangedRecord::Income(income) => {
                    supplies.entry(income.income_id).or_default().push(income);
                }
                ChangedRecord::Coefficient(coefficient) if coefficient.is_free() => {
                    free_slots.push(coefficient);
                }
                ChangedRecord::Coefficient(_) | ChangedRecord::Stock(_) => {}
            }
        }

        for (income_id, lines) in supplies {
            let total: Decimal = lines.iter().map(|l| l.total_price).sum();
            if !total.is_zero() {
                continue;
            }
            debug!(credential_id = credential_id.get(), income_id, "free supply detected");
            let text = format::free_supply_message(&lines);
            for user in subscribed(users, NotificationKind::Incomes) {
                report.record(self.deliver(user.telegram_id, &text, None).await);
            }
        }

        if !free_slots.is_empty() {
            self.free_acceptance(&free_slots, users, report).await;
        }
    }

    async fn figures(
        &self,
        credential_id: CredentialId,
        nm_id: Option<NmId>,
        warehouse: Option<&str>,
        sale: bool,
        now: DateTime<Utc>,
    ) -> ArticleFigures {
        let Some(nm_id) = nm_id else {
            return ArticleFigures::default();
        };
        let store = self.store.as_ref();

        let product = lookup(store.product(nm_id).await, "product").flatten();
        let activity = if sale {
            lookup(store.sale_activity(credential_id, nm_id, now).await, "sale activity")
        } else {
            lookup(store.order_activity(credential_id, nm_id, now).await, "order activity")
        }
        .unwrap_or_default();
        let total_stock =
            lookup(store.total_stock(credential_id, nm_id).await, "total stock").unwrap_or(0);
        let delivery_cost = match warehouse {
            Some(office) => lookup(
                store.latest_delivery_cost(credential_id, nm_id, office).await,
                "delivery cost",
            )
            .flatten(),
            None => None,
        };
        let commission = if sale {
            lookup(store.latest_commission(credential_id, nm_id).await, "commission").flatten()
        } else {
            None
        };

        ArticleFigures {
            product,
            activity,
            total_stock,
            delivery_cost,
            commission,
        }
    }

    async fn order(
        &self,
        credential_id: CredentialId,
        order: &Order,
        users: &[User],
        now: DateTime<Utc>,
        report: &mut DispatchReport,
    ) {
        let kind = if order.is_cancel {
            NotificationKind::Cancellations
        } else {
            NotificationKind::Orders
        };
        let recipients: Vec<&User> = subscribed(users, kind).collect();
        if recipients.is_empty() {
            return;
        }

        let figures = self
            .figures(
                credential_id,
                order.nm_id,
                order.warehouse_name.as_deref(),
                false,
                now,
            )
            .await;
        let text = if order.is_cancel {
            format::cancellation_message(order, &figures)
        } else {
            format::order_message(order, &figures)
        };
        for user in recipients {
            report.record(
                self.deliver(user.telegram_id, &text, figures.image_url())
                    .await,
            );
        }
    }

    async fn sale(
        &self,
        credential_id: CredentialId,
        sale: &Sale,
        users: &[User],
        now: DateTime<Utc>,
        report: &mut DispatchReport,
    ) {
        let recipients: Vec<&User> = subscribed(users, NotificationKind::Sales).collect();
        if recipients.is_empty() {
            return;
        }

        let figures = self
            .figures(
                credential_id,
                sale.nm_id,
                sale.warehouse_name.as_deref(),
                true,
                now,
            )
            .await;
        let text = format::sale_message(sale, &figures);
        for user in recipients {
            report.record(
                self.deliver(user.telegram_id, &text, figures.image_url())
                    .await,
            );
        }
    }

    async fn free_acceptance(
        &self,
        slots: &[AcceptanceCoefficient],
        users: &[User],
        report: &mut DispatchReport,
    ) {
        for user in users {
            let warehouses = match self.store.warehouse_subscriptions(user.id).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(user_id = user.id.get(), error = %e, "failed to load warehouse subscriptions");
                    continue;
                }
            };
            let box_types = match self.store.box_type_subscriptions(user.id).await {
                Ok(names) => names,
                Err(e) => {
                    warn!(user_id = user.id.get(), error = %e, "failed to load box type subscriptions");
                    continue;
                }
            };
            if warehouses.is_empty() && box_types.is_empty() {
                continue;
            }

            for slot in slots {
                let by_warehouse = warehouses.contains(&slot.warehouse_id);
                let by_box = slot
                    .box_type_name
                    .as_ref()
                    .is_some_and(|name| box_types.contains(name));
                if by_warehouse || by_box {
                    let text = format::free_acceptance_message(slot);
                    report.record(self.deliver(user.telegram_id, &text, None).await);
                }
            }
        }
    }

    /// Photo when an image is known, text otherwise; a failed photo falls
    /// back to text with the image URL inlined.
    async fn deliver(&self, chat: TelegramId, text: &str, image_url: Option<&str>) -> bool {
        if let Some(url) = image_url {
            match self.transport.send_photo(chat, url, text).await {
                Ok(()) => return true,
                Err(e) => {
                    debug!(chat = chat.get(), error = %e, "photo failed, falling back to text");
                    let fallback = format::photo_fallback(url, text);
                    return self.send_text(chat, &fallback).await;
                }
            }
        }
        self.send_text(chat, text).await
    }

    async fn send_text(&self, chat: TelegramId, text: &str) -> bool {
        match self.transport.send_message(chat, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(chat = chat.get(), error = %e, "notification delivery failed");
                false
            }
        }
    }
}

fn subscribed(users: &[User], kind: NotificationKind) -> impl Iterator<Item = &User> {
    users.iter().filter(move |user| user.notify.is_enabled(kind))
}

fn lookup<T>(result: Result<T>, what: &'static str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(what, error = %e, "figure lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::SqliteStore;
    use crate::domain::{NewCredential, Role, WarehouseId};
    use crate::port::outbound::store::CredentialStore;
    use crate::testkit::builders;
    use crate::testkit::store::memory_store;
    use crate::testkit::transport::{RecordingTransport, Sent};

    struct Fixture {
        store: Arc<SqliteStore>,
        transport: Arc<RecordingTransport>,
        credential_id: CredentialId,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(memory_store());
            let credential = store
                .insert_credential(&NewCredential {
                    value: builders::credential_value("d"),
                    role: Role::Base,
                    subscription_until: None,
                })
                .await
                .unwrap();
            Self {
                store,
                transport: Arc::new(RecordingTransport::new()),
                credential_id: credential.id,
            }
        }

        async fn user(&self, chat: i64) -> User {
            let user = self.store.ensure_user(TelegramId::new(chat)).await.unwrap();
            self.store
                .bind_credential(user.id, self.credential_id)
                .await
                .unwrap();
            user
        }

        fn dispatcher(&self) -> Dispatcher<SqliteStore> {
            Dispatcher::new(self.store.clone(), self.transport.clone())
        }
    }

    #[tokio::test]
    async fn cancellation_uses_cancel_flag() {
        let fx = Fixture::new().await;
        let user = fx.user(10).await;
        fx.store
            .set_notification(user.id, NotificationKind::Orders, false)
            .await
            .unwrap();

        let mut order = builders::order(fx.credential_id, "S1", Utc::now());
        order.is_cancel = true;
        let report = fx.dispatcher().notify(vec![order.into()]).await;

        assert_eq!(report.delivered, 1);
        assert!(fx.transport.sent()[0].text().contains("Отмена заказа"));
    }

    #[tokio::test]
    async fn failed_photo_falls_back_to_text_with_url() {
        let fx = Fixture::new().await;
        fx.user(10).await;
        let mut product = builders::product(100, Some(4.9), Utc::now());
        product.image_url = Some("https://img.test/100.webp".into());
        fx.store.upsert_product(&product).await.unwrap();
        fx.transport.fail_photos();

        let order = builders::order(fx.credential_id, "S1", Utc::now());
        let report = fx.dispatcher().notify(vec![order.into()]).await;

        assert_eq!(report, DispatchReport { delivered: 1, failed: 0 });
        match &fx.transport.sent()[0] {
            Sent::Message { html, .. } => {
                assert!(html.starts_with("https://img.test/100.webp\n"));
            }
            other => panic!("expected text fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delivery_failure_is_counted_not_raised() {
        let fx = Fixture::new().await;
        fx.user(10).await;
        fx.user(11).await;
        fx.transport.fail_chat(TelegramId::new(10));

        let sale = builders::sale(fx.credential_id, "R1", Utc::now());
        let report = fx.dispatcher().notify(vec![sale.into()]).await;

        assert_eq!(report, DispatchReport { delivered: 1, failed: 1 });
        assert_eq!(fx.transport.sent_to(TelegramId::new(11)).len(), 1);
    }

    #[tokio::test]
    async fn only_free_supplies_are_announced_once_per_group() {
        let fx = Fixture::new().await;
        fx.user(10).await;
        let now = Utc::now();

        let free_a = builders::income(fx.credential_id, 1, 100, 3, now);
        let free_b = builders::income(fx.credential_id, 1, 101, 4, now);
        let mut paid = builders::income(fx.credential_id, 2, 100, 1, now);
        paid.total_price = rust_decimal_macros::dec!(500);

        fx.dispatcher()
            .notify(vec![free_a.into(), free_b.into(), paid.into()])
            .await;

        let sent = fx.transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text().contains("Всего товаров:</b> 7"));
    }

    #[tokio::test]
    async fn free_acceptance_reaches_warehouse_or_box_subscribers() {
        let fx = Fixture::new().await;
        let by_warehouse = fx.user(10).await;
        let by_box = fx.user(11).await;
        fx.user(12).await;
        fx.store
            .subscribe_warehouse(by_warehouse.id, WarehouseId::new(507))
            .await
            .unwrap();
        fx.store
            .subscribe_box_type(by_box.id, "Монопаллеты")
            .await
            .unwrap();

        let now = Utc::now();
        let free = builders::coefficient(fx.credential_id, 507, "Короба", 0.0, now);
        let free_pallet = builders::coefficient(fx.credential_id, 300, "Монопаллеты", 0.0, now);
        let paid = builders::coefficient(fx.credential_id, 507, "Короба", 2.0, now);

        fx.dispatcher()
            .notify(vec![free.into(), free_pallet.into(), paid.into()])
            .await;

        assert_eq!(fx.transport.sent_to(TelegramId::new(10)).len(), 1);
        assert_eq!(fx.transport.sent_to(TelegramId::new(11)).len(), 1);
        assert!(fx.transport.sent_to(TelegramId::new(12)).is_empty());
    }

    #[tokio::test]
    async fn stock_changes_are_silent() {
        let fx = Fixture::new().await;
        fx.user(10).await;
        let stock = builders::stock(fx.credential_id, 100, "Коледино", 3, Utc::now());
        let report = fx.dispatcher().notify(vec![stock.into()]).await;
        assert_eq!(report, DispatchReport::default());
    }
}
