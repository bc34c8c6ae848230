//! Credential submission: shape check, trial minting, binding.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::credential::{redact, validate_credential_value, CredentialRejection};
use crate::domain::{Credential, NewCredential, TelegramId};
use crate::error::Result;
use crate::port::outbound::store::{CredentialStore, UserStore};

/// Result of a submitted credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Rejected(CredentialRejection),
    /// The credential is bound to the user. `trial_started` is true when the
    /// value was new and a trial was granted.
    Bound {
        credential: Credential,
        trial_started: bool,
    },
}

impl Submission {
    /// Reply text for the chat.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Rejected(_) => {
                "Кажется, это не похоже на токен. Убедитесь, что вы скопировали токен \
                 целиком, включая точки.\nПопробуйте ещё раз или /cancel, чтобы отменить."
            }
            Self::Bound {
                trial_started: true,
                ..
            } => {
                "Токен сохранён и привязан к вашему аккаунту! Вы получили \
                 <b>тестовый режим</b> на 30 дней. Приятного пользования ботом!"
            }
            Self::Bound { .. } => "Токен сохранён и привязан к вашему аккаунту!",
        }
    }
}

pub struct Onboarding<S> {
    store: Arc<S>,
}

impl<S> Onboarding<S>
where
    S: CredentialStore + UserStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn submit(&self, telegram_id: TelegramId, text: &str) -> Result<Submission> {
        self.submit_at(telegram_id, text, Utc::now()).await
    }

    /// Bind `text` as the chat's credential. A value already on file is
    /// shared rather than duplicated, and keeps its role and expiry.
    pub async fn submit_at(
        &self,
        telegram_id: TelegramId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Submission> {
        let value = match validate_credential_value(text) {
            Ok(value) => value,
            Err(rejection) => return Ok(Submission::Rejected(rejection)),
        };

        let user = self.store.ensure_user(telegram_id).await?;
        let (credential, trial_started) = match self.store.credential_by_value(value).await? {
            Some(existing) => (existing, false),
            None => {
                let created = self
                    .store
                    .insert_credential(&NewCredential::trial(value, now))
                    .await?;
                (created, true)
            }
        };
        self.store.bind_credential(user.id, credential.id).await?;

        info!(
            chat = telegram_id.get(),
            credential_id = credential.id.get(),
            token = %redact(value),
            trial_started,
            "credential bound"
        );
        Ok(Submission::Bound {
            credential,
            trial_started,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::domain::Role;
    use crate::testkit::builders::credential_value;
    use crate::testkit::store::memory_store;

    #[tokio::test]
    async fn malformed_value_is_rejected_without_creating_user() {
        let store = Arc::new(memory_store());
        let onboarding = Onboarding::new(store.clone());

        let outcome = onboarding.submit(TelegramId::new(9), "hello").await.unwrap();
        assert_eq!(outcome, Submission::Rejected(CredentialRejection::NotDotted));
        assert!(store.user_by_telegram(TelegramId::new(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn new_value_starts_trial() {
        let store = Arc::new(memory_store());
        let onboarding = Onboarding::new(store.clone());
        let now = Utc::now();

        let value = credential_value("a");
        let outcome = onboarding
            .submit_at(TelegramId::new(9), &format!("  {value}\n"), now)
            .await
            .unwrap();
        let Submission::Bound {
            credential,
            trial_started,
        } = outcome
        else {
            panic!("expected bound credential");
        };
        assert!(trial_started);
        assert_eq!(credential.role, Role::Test);
        assert_eq!(credential.value, value);
        let until = credential.subscription_until.unwrap();
        assert!((until - (now + Duration::days(30))).num_seconds().abs() < 1);

        let user = store.user_by_telegram(TelegramId::new(9)).await.unwrap().unwrap();
        assert_eq!(user.credential_id, Some(credential.id));
    }

    #[tokio::test]
    async fn known_value_is_shared_between_chats() {
        let store = Arc::new(memory_store());
        let onboarding = Onboarding::new(store.clone());
        let value = credential_value("b");

        onboarding.submit(TelegramId::new(1), &value).await.unwrap();
        let second = onboarding.submit(TelegramId::new(2), &value).await.unwrap();
        assert!(matches!(
            second,
            Submission::Bound {
                trial_started: false,
                ..
            }
        ));
        assert_eq!(second.message(), "Токен сохранён и привязан к вашему аккаунту!");

        let Submission::Bound { credential, .. } = second else {
            unreachable!()
        };
        let users = store.users_for_credential(credential.id).await.unwrap();
        assert_eq!(users.len(), 2);
    }
}
