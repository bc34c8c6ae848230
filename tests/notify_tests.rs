mod harness;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use harness::seller;
use harness::temp_db::TempDb;
use stockpulse::application::gate::{Access, RoleGate};
use stockpulse::application::notify::{DispatchReport, Dispatcher};
use stockpulse::domain::{NotificationKind, Role, TelegramId};
use stockpulse::port::outbound::store::UserStore;
use stockpulse::testkit::builders;
use stockpulse::testkit::transport::RecordingTransport;

#[tokio::test]
async fn sale_reaches_only_users_with_sales_switched_on() {
    let db = TempDb::create("notify-sales");
    let store = db.store();
    let cred = seller::credential(&store, "shop", Role::Base, None).await;

    let mut users = Vec::new();
    for chat in 1..=5 {
        users.push(seller::bind(&store, chat, &cred).await);
    }
    for user in &users[3..] {
        store
            .set_notification(user.id, NotificationKind::Sales, false)
            .await
            .unwrap();
    }

    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Dispatcher::new(store, transport.clone());
    let at = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();

    let report = dispatcher
        .notify_at(vec![builders::sale(cred.id, "R1", at).into()], at)
        .await;
    assert_eq!(report, DispatchReport { delivered: 3, failed: 0 });

    let mut chats: Vec<i64> = transport.sent().iter().map(|s| s.chat().get()).collect();
    chats.sort_unstable();
    assert_eq!(chats, vec![1, 2, 3]);
}

#[tokio::test]
async fn cancellation_uses_its_own_switch() {
    let db = TempDb::create("notify-cancel");
    let store = db.store();
    let cred = seller::credential(&store, "shop", Role::Base, None).await;
    let orders_only = seller::bind(&store, 10, &cred).await;
    seller::bind(&store, 11, &cred).await;
    store
        .set_notification(orders_only.id, NotificationKind::Cancellations, false)
        .await
        .unwrap();

    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Dispatcher::new(store, transport.clone());
    let at = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();

    let mut cancelled = builders::order(cred.id, "S100", at);
    cancelled.is_cancel = true;
    let report = dispatcher.notify_at(vec![cancelled.into()], at).await;

    assert_eq!(report.delivered, 1);
    assert!(transport.sent_to(TelegramId::new(10)).is_empty());
    assert_eq!(transport.sent_to(TelegramId::new(11)).len(), 1);
}

#[tokio::test]
async fn failed_chat_does_not_stop_the_fan_out() {
    let db = TempDb::create("notify-failure");
    let store = db.store();
    let cred = seller::credential(&store, "shop", Role::Base, None).await;
    seller::bind(&store, 20, &cred).await;
    seller::bind(&store, 21, &cred).await;

    let transport = Arc::new(RecordingTransport::new());
    transport.fail_chat(TelegramId::new(20));
    let dispatcher = Dispatcher::new(store, transport.clone());
    let at = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();

    let report = dispatcher
        .notify_at(vec![builders::order(cred.id, "S1", at).into()], at)
        .await;
    assert_eq!(report, DispatchReport { delivered: 1, failed: 1 });
    assert_eq!(transport.sent_to(TelegramId::new(21)).len(), 1);
}

#[tokio::test]
async fn changes_of_unbound_credentials_are_dropped() {
    let db = TempDb::create("notify-unbound");
    let store = db.store();
    let cred = seller::credential(&store, "orphan", Role::Base, None).await;

    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Dispatcher::new(store, transport.clone());
    let at = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();

    let report = dispatcher
        .notify_at(vec![builders::order(cred.id, "S1", at).into()], at)
        .await;
    assert_eq!(report, DispatchReport::default());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn sale_fans_out_only_to_its_credential() {
    let db = TempDb::create("notify-two-credentials");
    let store = db.store();
    let x = seller::credential(&store, "shop-x", Role::Base, None).await;
    let y = seller::credential(&store, "shop-y", Role::Base, None).await;
    for chat in 1..=3 {
        seller::bind(&store, chat, &x).await;
    }
    for chat in 4..=5 {
        seller::bind(&store, chat, &y).await;
    }

    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Dispatcher::new(store, transport.clone());
    let at = Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap();

    let report = dispatcher
        .notify_at(vec![builders::sale(x.id, "R9", at).into()], at)
        .await;
    assert_eq!(report, DispatchReport { delivered: 3, failed: 0 });

    let mut chats: Vec<i64> = transport.sent().iter().map(|s| s.chat().get()).collect();
    chats.sort_unstable();
    assert_eq!(chats, vec![1, 2, 3]);
}

#[tokio::test]
async fn gate_denies_chats_without_a_credential() {
    let db = TempDb::create("gate-unbound");
    let store = db.store();
    let free = seller::credential(&store, "free", Role::Free, None).await;
    seller::bind(&store, 30, &free).await;
    store.ensure_user(TelegramId::new(31)).await.unwrap();

    let gate = RoleGate::new(store);
    assert!(gate.has_role(TelegramId::new(30), &[Role::Free]).await.unwrap());
    assert!(!gate.has_role(TelegramId::new(31), &[Role::Free]).await.unwrap());
    assert!(!gate.has_role(TelegramId::new(32), &[Role::Free]).await.unwrap());
    assert!(matches!(
        gate.check(TelegramId::new(31), &[Role::Free, Role::Base]).await.unwrap(),
        Access::Denied { .. }
    ));
}
