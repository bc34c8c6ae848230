//! In-memory SQLite store for tests.

use crate::adapter::outbound::sqlite::database::connection::{create_pool_sized, run_migrations};
use crate::adapter::outbound::sqlite::SqliteStore;
use crate::domain::{CredentialId, NewCredential, Role};
use crate::port::outbound::store::CredentialStore;
use crate::testkit::builders::credential_value;

/// Build a migrated in-memory store.
///
/// The pool holds one connection: every `:memory:` connection is its own
/// database.
pub fn memory_store() -> SqliteStore {
    let pool = create_pool_sized(":memory:", 1).expect("in-memory sqlite pool should initialize");
    run_migrations(&pool).expect("migrations should apply");
    SqliteStore::new(pool)
}

/// A migrated in-memory store already holding credentials with ids
/// `1..=count`, for fixtures that build records by id.
pub async fn store_with_credentials(count: i64) -> SqliteStore {
    let store = memory_store();
    for n in 1..=count {
        let credential = store
            .insert_credential(&NewCredential {
                value: credential_value(&format!("seed-{n}")),
                role: Role::Base,
                subscription_until: None,
            })
            .await
            .expect("seed credential should insert");
        assert_eq!(credential.id, CredentialId::new(i32::try_from(n).expect("credential id fits in i32")), "credential ids start at 1");
    }
    store
}
