use chrono::{DateTime, Utc};
use stockpulse::adapter::outbound::sqlite::SqliteStore;
use stockpulse::domain::{Credential, NewCredential, Role, TelegramId, User};
use stockpulse::port::outbound::store::{CredentialStore, UserStore};
use stockpulse::testkit::builders::credential_value;

/// Register a credential with the given role and expiry.
pub async fn credential(
    store: &SqliteStore,
    seed: &str,
    role: Role,
    until: Option<DateTime<Utc>>,
) -> Credential {
    store
        .insert_credential(&NewCredential {
            value: credential_value(seed),
            role,
            subscription_until: until,
        })
        .await
        .expect("insert credential")
}

/// Create a chat user bound to `credential`.
pub async fn bind(store: &SqliteStore, chat: i64, credential: &Credential) -> User {
    let user = store
        .ensure_user(TelegramId::new(chat))
        .await
        .expect("ensure user");
    store
        .bind_credential(user.id, credential.id)
        .await
        .expect("bind credential");
    user
}
