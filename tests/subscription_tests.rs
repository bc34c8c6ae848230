mod harness;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use harness::seller;
use harness::temp_db::TempDb;
use stockpulse::application::subscription::SubscriptionService;
use stockpulse::domain::payment::PaymentStatus;
use stockpulse::domain::{Role, TelegramId};
use stockpulse::port::outbound::store::{CredentialStore, PaymentStore};
use stockpulse::testkit::billing::FakePaymentProvider;

#[tokio::test]
async fn payment_stacks_on_remaining_days_once() {
    let db = TempDb::create("subscription-stack");
    let store = db.store();
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let cred = seller::credential(&store, "shop", Role::Base, Some(now + Duration::days(10))).await;
    seller::bind(&store, 500, &cred).await;

    let provider = Arc::new(FakePaymentProvider::new());
    let service = SubscriptionService::new(store.clone(), provider.clone(), None);

    let outcome = service
        .create_payment(TelegramId::new(500), "advanced")
        .await
        .unwrap();
    assert!(outcome.ok);
    let payment_id = outcome.payment_id.unwrap();

    let pending = service
        .refresh_and_activate_at(payment_id, now)
        .await
        .unwrap();
    assert_eq!(pending.status, Some(PaymentStatus::Pending));
    assert!(pending.valid_until.is_none());

    provider.set_status("yk-1", PaymentStatus::Succeeded);
    let activated = service
        .refresh_and_activate_at(payment_id, now)
        .await
        .unwrap();
    assert!(activated.ok);
    assert_eq!(activated.role, Some(Role::Advanced));
    assert_eq!(activated.valid_until, Some(now + Duration::days(40)));

    // A second check must not extend again.
    let again = service
        .refresh_and_activate_at(payment_id, now + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(again.valid_until, Some(now + Duration::days(40)));

    let stored = store.credential(cred.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Advanced);
    assert_eq!(stored.subscription_until, Some(now + Duration::days(40)));
    assert_eq!(
        store.payment(payment_id).await.unwrap().unwrap().status,
        PaymentStatus::Succeeded
    );
}

#[tokio::test]
async fn expired_subscription_restarts_from_now() {
    let db = TempDb::create("subscription-expired");
    let store = db.store();
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let cred = seller::credential(&store, "shop", Role::Base, Some(now - Duration::days(3))).await;
    seller::bind(&store, 501, &cred).await;

    let provider = Arc::new(FakePaymentProvider::new());
    let service = SubscriptionService::new(store.clone(), provider.clone(), None);
    let payment_id = service
        .create_payment(TelegramId::new(501), "base")
        .await
        .unwrap()
        .payment_id
        .unwrap();
    provider.set_status("yk-1", PaymentStatus::Succeeded);

    let activated = service
        .refresh_and_activate_at(payment_id, now)
        .await
        .unwrap();
    assert_eq!(activated.valid_until, Some(now + Duration::days(30)));
}

#[tokio::test]
async fn canceled_payment_leaves_subscription_alone() {
    let db = TempDb::create("subscription-canceled");
    let store = db.store();
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let until = now + Duration::days(5);
    let cred = seller::credential(&store, "shop", Role::Base, Some(until)).await;
    seller::bind(&store, 502, &cred).await;

    let provider = Arc::new(FakePaymentProvider::new());
    let service = SubscriptionService::new(store.clone(), provider.clone(), None);
    let payment_id = service
        .create_payment(TelegramId::new(502), "base")
        .await
        .unwrap()
        .payment_id
        .unwrap();
    provider.set_status("yk-1", PaymentStatus::Canceled);

    let outcome = service
        .refresh_and_activate_at(payment_id, now)
        .await
        .unwrap();
    assert!(!outcome.ok);
    assert_eq!(
        store.credential(cred.id).await.unwrap().unwrap().subscription_until,
        Some(until)
    );
}

#[tokio::test]
async fn two_payments_for_one_credential_both_extend() {
    let db = TempDb::create("subscription-two-payments");
    let store = db.store();
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let cred = seller::credential(&store, "shop", Role::Base, Some(now + Duration::days(10))).await;
    seller::bind(&store, 503, &cred).await;
    seller::bind(&store, 504, &cred).await;

    let provider = Arc::new(FakePaymentProvider::new());
    let service = SubscriptionService::new(store.clone(), provider.clone(), None);
    let first = service
        .create_payment(TelegramId::new(503), "base")
        .await
        .unwrap()
        .payment_id
        .unwrap();
    let second = service
        .create_payment(TelegramId::new(504), "base")
        .await
        .unwrap()
        .payment_id
        .unwrap();
    provider.set_status("yk-1", PaymentStatus::Succeeded);
    provider.set_status("yk-2", PaymentStatus::Succeeded);

    let (a, b) = tokio::join!(
        service.refresh_and_activate_at(first, now),
        service.refresh_and_activate_at(second, now),
    );
    let mut expiries = vec![a.unwrap().valid_until, b.unwrap().valid_until];
    expiries.sort();
    assert_eq!(
        expiries,
        vec![Some(now + Duration::days(40)), Some(now + Duration::days(70))]
    );
    assert_eq!(
        store.credential(cred.id).await.unwrap().unwrap().subscription_until,
        Some(now + Duration::days(70))
    );
}
