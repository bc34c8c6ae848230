//! Credential registry queries.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;

use super::database::model::{last_insert_rowid, ts, NewTokenRow, TokenRow};
use super::database::schema::tokens;
use super::SqliteStore;
use crate::domain::{Credential, CredentialId, NewCredential};
use crate::error::{Error, Result};
use crate::port::outbound::store::CredentialStore;

fn load(conn: &mut SqliteConnection, id: i32) -> Result<Option<Credential>> {
    tokens::table
        .find(id)
        .select(TokenRow::as_select())
        .first(conn)
        .optional()?
        .map(Credential::try_from)
        .transpose()
}

impl CredentialStore for SqliteStore {
    async fn active_credentials(&self) -> Result<Vec<Credential>> {
        let mut conn = self.conn()?;
        let rows = tokens::table
            .filter(tokens::is_active.eq(true))
            .order(tokens::id.asc())
            .select(TokenRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(Credential::try_from).collect()
    }

    async fn credential(&self, id: CredentialId) -> Result<Option<Credential>> {
        let mut conn = self.conn()?;
        load(&mut conn, id.get())
    }

    async fn credential_by_value(&self, value: &str) -> Result<Option<Credential>> {
        let mut conn = self.conn()?;
        tokens::table
            .filter(tokens::value.eq(value))
            .select(TokenRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Credential::try_from)
            .transpose()
    }

    async fn insert_credential(&self, credential: &NewCredential) -> Result<Credential> {
        let row = NewTokenRow {
            value: credential.value.clone(),
            role: credential.role.as_str().to_string(),
            subscription_until: credential.subscription_until.map(ts),
            is_active: true,
            created_at: ts(Utc::now()),
        };
        let mut conn = self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            diesel::insert_into(tokens::table).values(&row).execute(conn)?;
            let id = last_insert_rowid(conn)?;
            load(conn, id)?.ok_or_else(|| Error::NotFound(format!("credential {id}")))
        })
    }

    async fn expiring_credentials(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Credential>> {
        let mut conn = self.conn()?;
        let rows = tokens::table
            .filter(tokens::is_active.eq(true))
            .filter(tokens::subscription_until.gt(ts(now)))
            .filter(tokens::subscription_until.le(ts(now + window)))
            .select(TokenRow::as_select())
            .load(&mut conn)?;
        rows.into_iter().map(Credential::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::testkit::store::memory_store;

    #[tokio::test]
    async fn inserted_credential_is_active_and_findable() {
        let store = memory_store();
        let now = Utc::now();
        let created = store
            .insert_credential(&NewCredential::trial("tok.en.value", now))
            .await
            .unwrap();

        assert_eq!(created.role, Role::Test);
        assert!(created.is_active);

        let by_value = store.credential_by_value("tok.en.value").await.unwrap();
        assert_eq!(by_value.map(|c| c.id), Some(created.id));
        assert_eq!(store.active_credentials().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_value_is_rejected() {
        let store = memory_store();
        let new = NewCredential::trial("same.value.x", Utc::now());
        store.insert_credential(&new).await.unwrap();
        assert!(store.insert_credential(&new).await.is_err());
    }

    #[tokio::test]
    async fn expiring_window_excludes_far_and_lapsed() {
        let store = memory_store();
        let now = Utc::now();
        for (value, offset) in [("a.b.soon", 2), ("a.b.far", 10), ("a.b.gone", -1)] {
            store
                .insert_credential(&NewCredential {
                    value: value.into(),
                    role: Role::Base,
                    subscription_until: Some(now + Duration::days(offset)),
                })
                .await
                .unwrap();
        }

        let expiring = store
            .expiring_credentials(now, Duration::days(3))
            .await
            .unwrap();
        let values: Vec<_> = expiring.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["a.b.soon"]);
    }
}
