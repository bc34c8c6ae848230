//! Payment ledger queries and atomic subscription activation.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::database::model::{
    last_insert_rowid, money, parse_ts, ts, NewPaymentRow, PaymentRow,
};
use super::database::schema::{payments, tokens, users};
use super::SqliteStore;
use crate::domain::payment::{NewPayment, Payment, PaymentStatus};
use crate::domain::credential::extended_expiry;
use crate::domain::{PaymentId, Role};
use crate::error::{Error, Result};
use crate::port::outbound::store::PaymentStore;

fn load(conn: &mut SqliteConnection, id: i32) -> Result<Option<Payment>> {
    payments::table
        .find(id)
        .select(PaymentRow::as_select())
        .first(conn)
        .optional()?
        .map(Payment::try_from)
        .transpose()
}

impl PaymentStore for SqliteStore {
    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment> {
        let row = NewPaymentRow {
            user_id: payment.user_id.get(),
            token_id: payment.credential_id.get(),
            tariff: payment.tariff.clone(),
            amount: money(payment.amount),
            currency: payment.currency.clone(),
            status: PaymentStatus::Pending.as_str().to_string(),
            created_at: ts(Utc::now()),
        };
        let mut conn = self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            diesel::insert_into(payments::table).values(&row).execute(conn)?;
            let id = last_insert_rowid(conn)?;
            load(conn, id)?.ok_or_else(|| Error::NotFound(format!("payment {id}")))
        })
    }

    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let mut conn = self.conn()?;
        load(&mut conn, id.get())
    }

    async fn update_payment(
        &self,
        id: PaymentId,
        provider_payment_id: Option<&str>,
        status: PaymentStatus,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let target = payments::table.find(id.get());
        let updated = match provider_payment_id {
            Some(provider_id) => diesel::update(target)
                .set((
                    payments::provider_payment_id.eq(provider_id),
                    payments::status.eq(status.as_str()),
                ))
                .execute(&mut conn)?,
            None => diesel::update(target)
                .set(payments::status.eq(status.as_str()))
                .execute(&mut conn)?,
        };
        if updated == 0 {
            return Err(Error::NotFound(format!("payment {id}")));
        }
        Ok(())
    }

    async fn complete_payment(
        &self,
        id: PaymentId,
        role: Role,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let succeeded = PaymentStatus::Succeeded.as_str();
        let mut conn = self.conn()?;
        conn.immediate_transaction::<_, Error, _>(|conn| {
            let payment =
                load(conn, id.get())?.ok_or_else(|| Error::NotFound(format!("payment {id}")))?;

            let claimed = diesel::update(
                payments::table
                    .find(id.get())
                    .filter(payments::status.ne(succeeded)),
            )
            .set(payments::status.eq(succeeded))
            .execute(conn)?;
            if claimed == 0 {
                return Ok(None);
            }

            let credential_id = payment.credential_id.get();
            let current = tokens::table
                .find(credential_id)
                .select(tokens::subscription_until)
                .first::<Option<String>>(conn)
                .optional()?
                .ok_or_else(|| Error::NotFound(format!("credential {credential_id}")))?
                .as_deref()
                .map(parse_ts)
                .transpose()?;
            let until = extended_expiry(current, now, days);

            diesel::update(tokens::table.find(credential_id))
                .set((
                    tokens::role.eq(role.as_str()),
                    tokens::subscription_until.eq(Some(ts(until))),
                    tokens::is_active.eq(true),
                ))
                .execute(conn)?;
            diesel::update(users::table.find(payment.user_id.get()))
                .set(users::subscription_until.eq(Some(ts(until))))
                .execute(conn)?;
            Ok(Some(until))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewCredential, TelegramId};
    use crate::port::outbound::store::{CredentialStore, UserStore};
    use crate::testkit::store::memory_store;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    async fn pending(store: &SqliteStore) -> Payment {
        let credential = store
            .insert_credential(&NewCredential::placeholder())
            .await
            .unwrap();
        let user = store.ensure_user(TelegramId::new(5)).await.unwrap();
        store.bind_credential(user.id, credential.id).await.unwrap();
        store
            .insert_payment(&NewPayment {
                user_id: user.id,
                credential_id: credential.id,
                tariff: "base".into(),
                amount: dec!(349.00),
                currency: "RUB".into(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn inserted_payment_is_pending() {
        let store = memory_store();
        let payment = pending(&store).await;
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, dec!(349.00));
        assert_eq!(payment.provider_payment_id, None);
    }

    #[tokio::test]
    async fn complete_payment_applies_subscription_once() {
        let store = memory_store();
        let payment = pending(&store).await;
        let now = Utc::now();
        let until = now + Duration::days(30);

        let applied = store
            .complete_payment(payment.id, Role::Base, 30, now)
            .await
            .unwrap();
        assert_eq!(applied.map(|u| u.timestamp()), Some(until.timestamp()));
        assert!(store
            .complete_payment(payment.id, Role::Advanced, 30, now)
            .await
            .unwrap()
            .is_none());

        let credential = store.credential(payment.credential_id).await.unwrap().unwrap();
        assert_eq!(credential.role, Role::Base);
        assert_eq!(
            credential.subscription_until.map(|u| u.timestamp()),
            Some(until.timestamp())
        );
        let user = store.user_by_telegram(TelegramId::new(5)).await.unwrap().unwrap();
        assert_eq!(
            user.subscription_until.map(|u| u.timestamp()),
            Some(until.timestamp())
        );
    }

    #[tokio::test]
    async fn second_payment_stacks_on_the_stored_expiry() {
        let store = memory_store();
        let first = pending(&store).await;
        let second = store
            .insert_payment(&NewPayment {
                user_id: first.user_id,
                credential_id: first.credential_id,
                tariff: "base".into(),
                amount: dec!(349.00),
                currency: "RUB".into(),
            })
            .await
            .unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        store.complete_payment(first.id, Role::Base, 30, now).await.unwrap();
        let until = store
            .complete_payment(second.id, Role::Base, 30, now)
            .await
            .unwrap();
        assert_eq!(until, Some(now + Duration::days(60)));

        let credential = store.credential(first.credential_id).await.unwrap().unwrap();
        assert_eq!(credential.subscription_until, Some(now + Duration::days(60)));
    }

    #[tokio::test]
    async fn provider_id_is_recorded() {
        let store = memory_store();
        let payment = pending(&store).await;
        store
            .update_payment(payment.id, Some("2c5d-yk"), PaymentStatus::Pending)
            .await
            .unwrap();
        let reloaded = store.payment(payment.id).await.unwrap().unwrap();
        assert_eq!(reloaded.provider_payment_id.as_deref(), Some("2c5d-yk"));
    }
}
