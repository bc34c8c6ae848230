//! Users, notification switches and warehouse / box-type subscriptions.

use chrono::Utc;
use diesel::prelude::*;

use super::database::model::{ts, NewUserRow, UserRow};
use super::database::schema::{user_box_types, user_warehouses, users};
use super::SqliteStore;
use crate::domain::{CredentialId, NotificationKind, TelegramId, User, UserId, WarehouseId};
use crate::error::{Error, Result};
use crate::port::outbound::store::UserStore;

fn find_by_telegram(conn: &mut SqliteConnection, telegram_id: i64) -> Result<Option<User>> {
    users::table
        .filter(users::telegram_id.eq(telegram_id))
        .select(UserRow::as_select())
        .first(conn)
        .optional()?
        .map(User::try_from)
        .transpose()
}

fn load_users(rows: Vec<UserRow>) -> Result<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

impl UserStore for SqliteStore {
    async fn user_by_telegram(&self, telegram_id: TelegramId) -> Result<Option<User>> {
        let mut conn = self.conn()?;
        find_by_telegram(&mut conn, telegram_id.get())
    }

    async fn ensure_user(&self, telegram_id: TelegramId) -> Result<User> {
        let mut conn = self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            diesel::insert_or_ignore_into(users::table)
                .values(&NewUserRow {
                    telegram_id: telegram_id.get(),
                    created_at: ts(Utc::now()),
                })
                .execute(conn)?;
            find_by_telegram(conn, telegram_id.get())?
                .ok_or_else(|| Error::NotFound(format!("user {telegram_id}")))
        })
    }

    async fn bind_credential(&self, user_id: UserId, credential_id: CredentialId) -> Result<()> {
        let mut conn = self.conn()?;
        let updated = diesel::update(users::table.find(user_id.get()))
            .set(users::token_id.eq(Some(credential_id.get())))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(Error::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    async fn users_for_credential(&self, credential_id: CredentialId) -> Result<Vec<User>> {
        let mut conn = self.conn()?;
        let rows = users::table
            .filter(users::token_id.eq(credential_id.get()))
            .order(users::id.asc())
            .select(UserRow::as_select())
            .load(&mut conn)?;
        load_users(rows)
    }

    async fn daily_report_recipients(&self) -> Result<Vec<User>> {
        let mut conn = self.conn()?;
        let rows = users::table
            .filter(users::token_id.is_not_null())
            .filter(users::notify_daily_report.eq(true))
            .order(users::id.asc())
            .select(UserRow::as_select())
            .load(&mut conn)?;
        load_users(rows)
    }

    async fn set_notification(
        &self,
        user_id: UserId,
        kind: NotificationKind,
        enabled: bool,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let target = users::table.find(user_id.get());
        let updated = match kind {
            NotificationKind::Orders => diesel::update(target)
                .set(users::notify_orders.eq(enabled))
                .execute(&mut conn)?,
            NotificationKind::Sales => diesel::update(target)
                .set(users::notify_sales.eq(enabled))
                .execute(&mut conn)?,
            NotificationKind::DailyReport => diesel::update(target)
                .set(users::notify_daily_report.eq(enabled))
                .execute(&mut conn)?,
            NotificationKind::Incomes => diesel::update(target)
                .set(users::notify_incomes.eq(enabled))
                .execute(&mut conn)?,
            NotificationKind::Cancellations => diesel::update(target)
                .set(users::notify_cancel.eq(enabled))
                .execute(&mut conn)?,
        };
        if updated == 0 {
            return Err(Error::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    async fn warehouse_subscriptions(&self, user_id: UserId) -> Result<Vec<WarehouseId>> {
        let mut conn = self.conn()?;
        let ids: Vec<i64> = user_warehouses::table
            .filter(user_warehouses::user_id.eq(user_id.get()))
            .order(user_warehouses::warehouse_id.asc())
            .select(user_warehouses::warehouse_id)
            .load(&mut conn)?;
        Ok(ids.into_iter().map(WarehouseId::new).collect())
    }

    async fn subscribe_warehouse(&self, user_id: UserId, warehouse_id: WarehouseId) -> Result<bool> {
        let mut conn = self.conn()?;
        let inserted = diesel::insert_or_ignore_into(user_warehouses::table)
            .values((
                user_warehouses::user_id.eq(user_id.get()),
                user_warehouses::warehouse_id.eq(warehouse_id.get()),
            ))
            .execute(&mut conn)?;
        Ok(inserted > 0)
    }

    async fn unsubscribe_warehouse(
        &self,
        user_id: UserId,
        warehouse_id: WarehouseId,
    ) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            user_warehouses::table.find((user_id.get(), warehouse_id.get())),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    async fn box_type_subscriptions(&self, user_id: UserId) -> Result<Vec<String>> {
        let mut conn = self.conn()?;
        Ok(user_box_types::table
            .filter(user_box_types::user_id.eq(user_id.get()))
            .order(user_box_types::box_type.asc())
            .select(user_box_types::box_type)
            .load(&mut conn)?)
    }

    async fn subscribe_box_type(&self, user_id: UserId, box_type: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let inserted = diesel::insert_or_ignore_into(user_box_types::table)
            .values((
                user_box_types::user_id.eq(user_id.get()),
                user_box_types::box_type.eq(box_type),
            ))
            .execute(&mut conn)?;
        Ok(inserted > 0)
    }

    async fn unsubscribe_box_type(&self, user_id: UserId, box_type: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(user_box_types::table.find((user_id.get(), box_type)))
            .execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewCredential;
    use crate::port::outbound::store::CredentialStore;
    use crate::testkit::store::memory_store;

    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let store = memory_store();
        let first = store.ensure_user(TelegramId::new(42)).await.unwrap();
        let second = store.ensure_user(TelegramId::new(42)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.notify.orders && first.notify.cancellations);
        assert_eq!(first.credential_id, None);
    }

    #[tokio::test]
    async fn users_are_resolved_by_bound_credential() {
        let store = memory_store();
        let credential = store
            .insert_credential(&NewCredential::trial("x.y.z", Utc::now()))
            .await
            .unwrap();
        let bound = store.ensure_user(TelegramId::new(1)).await.unwrap();
        store.ensure_user(TelegramId::new(2)).await.unwrap();
        store.bind_credential(bound.id, credential.id).await.unwrap();

        let users = store.users_for_credential(credential.id).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].telegram_id, TelegramId::new(1));
        assert_eq!(store.daily_report_recipients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn notification_switch_persists() {
        let store = memory_store();
        let user = store.ensure_user(TelegramId::new(7)).await.unwrap();
        store
            .set_notification(user.id, NotificationKind::Cancellations, false)
            .await
            .unwrap();
        let reloaded = store.user_by_telegram(TelegramId::new(7)).await.unwrap().unwrap();
        assert!(!reloaded.notify.cancellations);
        assert!(reloaded.notify.sales);
    }

    #[tokio::test]
    async fn warehouse_subscription_reports_duplicates() {
        let store = memory_store();
        let user = store.ensure_user(TelegramId::new(7)).await.unwrap();
        let warehouse = WarehouseId::new(507);

        assert!(store.subscribe_warehouse(user.id, warehouse).await.unwrap());
        assert!(!store.subscribe_warehouse(user.id, warehouse).await.unwrap());
        assert_eq!(
            store.warehouse_subscriptions(user.id).await.unwrap(),
            vec![warehouse]
        );
        assert!(store.unsubscribe_warehouse(user.id, warehouse).await.unwrap());
        assert!(!store.unsubscribe_warehouse(user.id, warehouse).await.unwrap());
    }

    #[tokio::test]
    async fn box_type_subscriptions_round_trip() {
        let store = memory_store();
        let user = store.ensure_user(TelegramId::new(7)).await.unwrap();
        assert!(store.subscribe_box_type(user.id, "Короба").await.unwrap());
        assert_eq!(
            store.box_type_subscriptions(user.id).await.unwrap(),
            vec!["Короба".to_string()]
        );
        assert!(store.unsubscribe_box_type(user.id, "Короба").await.unwrap());
    }
}
