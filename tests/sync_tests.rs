mod harness;

use std::sync::Arc;

use chrono::{Duration, SubsecRound, TimeZone, Utc};
use harness::seller;
use harness::temp_db::TempDb;
use stockpulse::adapter::outbound::report::CsvReportRenderer;
use stockpulse::application::notify::DispatchReport;
use stockpulse::application::products::{CatalogConfig, ProductCatalog};
use stockpulse::application::scheduler::{Scheduler, SchedulerSettings};
use stockpulse::application::sync::{Pollers, SyncDomain, SyncWindows};
use stockpulse::domain::{ChangedRecord, Role};
use stockpulse::port::outbound::gateway::{RawIncome, RawOrder};
use stockpulse::port::outbound::store::RecordStore;
use stockpulse::testkit::billing::FakeEnricher;
use stockpulse::testkit::builders;
use stockpulse::testkit::gateway::ScriptedGateway;
use stockpulse::testkit::transport::RecordingTransport;

fn raw_order(srid: &str, changed: &str, is_cancel: bool) -> RawOrder {
    RawOrder {
        srid: Some(srid.into()),
        last_change_date: Some(changed.into()),
        date: Some("2025-03-12T09:55:00".into()),
        warehouse_name: Some("Коледино".into()),
        nm_id: Some(100),
        subject: Some("Футболки".into()),
        is_cancel,
        ..RawOrder::default()
    }
}

struct Setup {
    db: TempDb,
    gateway: Arc<ScriptedGateway>,
    transport: Arc<RecordingTransport>,
}

impl Setup {
    fn new(name: &str) -> Self {
        Self {
            db: TempDb::create(name),
            gateway: Arc::new(ScriptedGateway::new()),
            transport: Arc::new(RecordingTransport::new()),
        }
    }

    fn catalog(&self) -> Arc<ProductCatalog<stockpulse::adapter::outbound::sqlite::SqliteStore>> {
        Arc::new(ProductCatalog::new(
            self.db.store(),
            Arc::new(FakeEnricher::new()),
            CatalogConfig::default(),
        ))
    }

    fn scheduler(&self) -> Scheduler<stockpulse::adapter::outbound::sqlite::SqliteStore> {
        Scheduler::new(
            self.db.store(),
            self.gateway.clone(),
            self.transport.clone(),
            Arc::new(CsvReportRenderer::new()),
            self.catalog(),
            SchedulerSettings::default(),
        )
    }

    fn pollers(&self) -> Pollers<stockpulse::adapter::outbound::sqlite::SqliteStore> {
        let gateway: Arc<dyn stockpulse::port::outbound::gateway::StatisticsGateway> =
            self.gateway.clone();
        Pollers::new(
            &self.db.store(),
            &gateway,
            &self.catalog(),
            SyncWindows::default(),
            Utc::now(),
        )
    }
}

#[tokio::test]
async fn order_then_cancellation_is_reported_twice_and_never_again() {
    let setup = Setup::new("order-cancel");
    let store = setup.db.store();
    let cred = seller::credential(&store, "seller", Role::Base, None).await;
    seller::bind(&store, 1001, &cred).await;

    setup.gateway.set_orders(
        &cred.value,
        vec![raw_order("S100", "2025-03-12T10:00:00", false)],
    );
    let scheduler = setup.scheduler();

    let first = scheduler.sync_domain(SyncDomain::Orders).await.unwrap();
    assert_eq!(first, DispatchReport { delivered: 1, failed: 0 });

    // Same rows again: nothing new to say.
    let repeat = scheduler.sync_domain(SyncDomain::Orders).await.unwrap();
    assert_eq!(repeat, DispatchReport::default());

    setup.gateway.set_orders(
        &cred.value,
        vec![raw_order("S100", "2025-03-12T11:00:00", true)],
    );
    let cancelled = scheduler.sync_domain(SyncDomain::Orders).await.unwrap();
    assert_eq!(cancelled.delivered, 1);

    let sent = setup.transport.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|s| s.chat().get() == 1001));
}

#[tokio::test]
async fn failing_credential_does_not_hide_other_sellers() {
    let setup = Setup::new("partial-failure");
    let store = setup.db.store();
    let broken = seller::credential(&store, "broken", Role::Base, None).await;
    let healthy = seller::credential(&store, "healthy", Role::Base, None).await;
    seller::bind(&store, 1, &broken).await;
    seller::bind(&store, 2, &healthy).await;

    setup.gateway.fail(&broken.value);
    setup.gateway.set_orders(
        &healthy.value,
        vec![raw_order("H1", "2025-03-12T10:00:00", false)],
    );

    let pollers = setup.pollers();
    let changed = pollers
        .poll(SyncDomain::Orders, Utc::now())
        .await
        .unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].credential_id(), healthy.id);
}

#[tokio::test]
async fn watermark_never_moves_backwards() {
    let setup = Setup::new("watermark");
    let store = setup.db.store();
    let cred = seller::credential(&store, "seller", Role::Base, None).await;
    let pollers = setup.pollers();

    // Stored timestamps keep milliseconds.
    let now = Utc::now().trunc_subsecs(3);
    let newest = now - Duration::minutes(1);
    setup.gateway.set_orders(
        &cred.value,
        vec![RawOrder {
            srid: Some("W1".into()),
            last_change_date: Some(newest.to_rfc3339()),
            ..RawOrder::default()
        }],
    );
    pollers.poll(SyncDomain::Orders, now).await.unwrap();
    assert_eq!(pollers.orders.watermark(), newest);

    setup.gateway.set_orders(
        &cred.value,
        vec![RawOrder {
            srid: Some("W0".into()),
            last_change_date: Some((now - Duration::days(2)).to_rfc3339()),
            ..RawOrder::default()
        }],
    );
    let changed = pollers.poll(SyncDomain::Orders, now).await.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(pollers.orders.watermark(), newest);
}

#[tokio::test]
async fn merge_is_idempotent_across_store_handles() {
    let db = TempDb::create("idempotent");
    let store = db.store();
    let cred = seller::credential(&store, "seller", Role::Base, None).await;
    let at = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();
    let batch = vec![
        builders::order(cred.id, "A", at),
        builders::order(cred.id, "B", at),
    ];

    assert_eq!(store.merge_orders(batch.clone()).await.unwrap().len(), 2);
    assert!(store.merge_orders(batch.clone()).await.unwrap().is_empty());

    let mut cancelled = batch[1].clone();
    cancelled.is_cancel = true;
    cancelled.last_change_date = at + Duration::hours(1);
    let changed = store.merge_orders(vec![cancelled]).await.unwrap();
    assert_eq!(changed.len(), 1);
    assert!(changed[0].is_cancel);
}

#[tokio::test]
async fn free_supply_is_grouped_by_income() {
    let setup = Setup::new("free-supply");
    let store = setup.db.store();
    let cred = seller::credential(&store, "seller", Role::Base, None).await;
    seller::bind(&store, 7, &cred).await;

    let line = |income_id: i64, nm_id: i64, price: i64| RawIncome {
        income_id: Some(income_id),
        barcode: Some(format!("2000{nm_id}")),
        last_change_date: Some("2025-03-12T10:00:00".into()),
        warehouse_name: Some("Коледино".into()),
        quantity: Some(5),
        total_price: Some(price.into()),
        nm_id: Some(nm_id),
        ..RawIncome::default()
    };
    setup.gateway.set_incomes(
        &cred.value,
        vec![line(1, 100, 0), line(1, 101, 0), line(2, 102, 500)],
    );

    let scheduler = setup.scheduler();
    let report = scheduler.sync_domain(SyncDomain::Incomes).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(setup.transport.sent().len(), 1);
}

#[tokio::test]
async fn coefficient_changes_are_detected_per_slot() {
    let setup = Setup::new("coefficients");
    let store = setup.db.store();
    let cred = seller::credential(&store, "seller", Role::Base, None).await;
    let at = Utc.with_ymd_and_hms(2025, 3, 12, 0, 0, 0).unwrap();

    let paid = builders::coefficient(cred.id, 507, "Короба", 1.0, at);
    assert_eq!(store.merge_coefficients(vec![paid.clone()]).await.unwrap().len(), 1);
    assert!(store.merge_coefficients(vec![paid]).await.unwrap().is_empty());

    let free = builders::coefficient(cred.id, 507, "Короба", 0.0, at);
    let changed = store.merge_coefficients(vec![free]).await.unwrap();
    assert_eq!(changed.len(), 1);
    let record = ChangedRecord::from(changed[0].clone());
    assert_eq!(record.credential_id(), cred.id);
    assert!(matches!(record, ChangedRecord::Coefficient(c) if c.is_free()));
}
