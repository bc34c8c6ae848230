//! Role-based feature gating.
//!
//! A chat's role is the role of the credential bound to its user. No user
//! or no credential resolves to `free` for feature tiers, but is always
//! denied by access checks.

use std::sync::Arc;

use tracing::debug;

use crate::domain::role::allowed_roles_for_history;
use crate::domain::{Capabilities, Role, TelegramId};
use crate::error::Result;
use crate::port::outbound::store::{CredentialStore, UserStore};

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted(Role),
    Denied { role: Role, allowed: Vec<Role> },
}

impl Access {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// User-facing explanation for a denial.
    #[must_use]
    pub fn denial_message(&self) -> Option<String> {
        match self {
            Self::Granted(_) => None,
            Self::Denied { role, allowed } => {
                let names: Vec<&str> = allowed
                    .iter()
                    .filter(|r| **r != Role::Super)
                    .map(|r| r.as_str())
                    .collect();
                Some(if names.is_empty() {
                    format!("⛔ Функция недоступна для тарифа <b>{role}</b>.")
                } else {
                    format!(
                        "⛔ Функция недоступна для тарифа <b>{role}</b>.\nДоступно на тарифах: {}.",
                        names.join(", ")
                    )
                })
            }
        }
    }
}

pub struct RoleGate<S> {
    store: Arc<S>,
}

impl<S> RoleGate<S>
where
    S: UserStore + CredentialStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Role of the bound credential, `None` when the chat has none.
    async fn bound_role(&self, telegram_id: TelegramId) -> Result<Option<Role>> {
        let Some(user) = self.store.user_by_telegram(telegram_id).await? else {
            return Ok(None);
        };
        let Some(credential_id) = user.credential_id else {
            return Ok(None);
        };
        Ok(self
            .store
            .credential(credential_id)
            .await?
            .map(|credential| credential.role))
    }

    pub async fn get_role(&self, telegram_id: TelegramId) -> Result<Role> {
        Ok(self.bound_role(telegram_id).await?.unwrap_or(Role::Free))
    }

    /// False for chats without a bound credential, whatever `allowed` holds.
    pub async fn has_role(&self, telegram_id: TelegramId, allowed: &[Role]) -> Result<bool> {
        Ok(self.check(telegram_id, allowed).await?.is_granted())
    }

    pub async fn check(&self, telegram_id: TelegramId, allowed: &[Role]) -> Result<Access> {
        let bound = self.bound_role(telegram_id).await?;
        match bound {
            Some(role) if role.is_allowed(allowed) => Ok(Access::Granted(role)),
            _ => {
                let role = bound.unwrap_or(Role::Free);
                debug!(chat = telegram_id.get(), %role, bound = bound.is_some(), "access denied");
                Ok(Access::Denied {
                    role,
                    allowed: allowed.to_vec(),
                })
            }
        }
    }

    /// Gate a report covering `days` of history.
    pub async fn check_history(&self, telegram_id: TelegramId, days: u32) -> Result<Access> {
        self.check(telegram_id, &allowed_roles_for_history(days))
            .await
    }

    pub async fn capabilities(&self, telegram_id: TelegramId) -> Result<Capabilities> {
        Ok(self.get_role(telegram_id).await?.capabilities())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::SqliteStore;
    use crate::domain::NewCredential;
    use crate::testkit::builders::credential_value;
    use crate::testkit::store::memory_store;

    async fn bound(store: &SqliteStore, chat: i64, role: Role) {
        let credential = store
            .insert_credential(&NewCredential {
                value: credential_value(&chat.to_string()),
                role,
                subscription_until: None,
            })
            .await
            .unwrap();
        let user = store.ensure_user(TelegramId::new(chat)).await.unwrap();
        store.bind_credential(user.id, credential.id).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_or_unbound_chat_is_free() {
        let store = Arc::new(memory_store());
        store.ensure_user(TelegramId::new(2)).await.unwrap();
        let gate = RoleGate::new(store);

        assert_eq!(gate.get_role(TelegramId::new(1)).await.unwrap(), Role::Free);
        assert_eq!(gate.get_role(TelegramId::new(2)).await.unwrap(), Role::Free);
        assert!(!gate
            .has_role(TelegramId::new(1), &[Role::Base])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unbound_chat_is_denied_even_for_free_features() {
        let store = Arc::new(memory_store());
        store.ensure_user(TelegramId::new(2)).await.unwrap();
        bound(&store, 3, Role::Free).await;
        let gate = RoleGate::new(store);

        assert!(!gate
            .has_role(TelegramId::new(99), &[Role::Free])
            .await
            .unwrap());
        assert!(!gate
            .has_role(TelegramId::new(2), &[Role::Free])
            .await
            .unwrap());
        assert!(matches!(
            gate.check(TelegramId::new(2), &[Role::Free]).await.unwrap(),
            Access::Denied { role: Role::Free, .. }
        ));
        assert!(gate
            .has_role(TelegramId::new(3), &[Role::Free])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn history_depth_gating() {
        let store = Arc::new(memory_store());
        bound(&store, 1, Role::Base).await;
        bound(&store, 2, Role::Advanced).await;
        bound(&store, 3, Role::Super).await;
        let gate = RoleGate::new(store);

        assert!(gate.check_history(TelegramId::new(1), 7).await.unwrap().is_granted());
        let denied = gate.check_history(TelegramId::new(1), 30).await.unwrap();
        assert!(!denied.is_granted());
        let message = denied.denial_message().unwrap();
        assert!(message.contains("advanced"));
        assert!(!message.contains("super"));

        assert!(gate.check_history(TelegramId::new(2), 90).await.unwrap().is_granted());
        assert!(gate.check_history(TelegramId::new(3), 14).await.unwrap().is_granted());
        assert!(!gate.check_history(TelegramId::new(2), 14).await.unwrap().is_granted());
    }

    #[tokio::test]
    async fn capabilities_follow_role() {
        let store = Arc::new(memory_store());
        bound(&store, 1, Role::Base).await;
        let gate = RoleGate::new(store);
        let caps = gate.capabilities(TelegramId::new(1)).await.unwrap();
        assert_eq!(caps.max_warehouses, Some(3));
    }
}
