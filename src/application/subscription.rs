//! Paid subscriptions: checkout creation and activation.
//!
//! Activation is idempotent. The store flips a payment to `succeeded` and
//! extends the credential in one transaction, so a payment polled twice
//! extends the subscription once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::payment::{ActivationOutcome, NewPayment, PaymentOutcome, PaymentStatus};
use crate::domain::tariff::Tariff;
use crate::domain::{Credential, CredentialId, NewCredential, PaymentId, TelegramId, User};
use crate::error::Result;
use crate::port::outbound::billing::{CheckoutRequest, PaymentProvider};
use crate::port::outbound::store::{CredentialStore, PaymentStore, UserStore};

/// Where the provider sends the user after paying.
const FALLBACK_RETURN_URL: &str = "https://yookassa.ru/";

/// Deep link back into the bot. A base ending in `start=paid` gets the
/// local payment id appended so `/start` can confirm it.
#[must_use]
pub fn return_url(base: Option<&str>, payment_id: PaymentId) -> String {
    match base.map(str::trim).filter(|b| !b.is_empty()) {
        Some(base) if base.ends_with("start=paid") => format!("{base}_{payment_id}"),
        Some(base) => base.to_string(),
        None => FALLBACK_RETURN_URL.to_string(),
    }
}

pub struct SubscriptionService<S> {
    store: Arc<S>,
    provider: Arc<dyn PaymentProvider>,
    return_url_base: Option<String>,
}

impl<S> SubscriptionService<S>
where
    S: UserStore + CredentialStore + PaymentStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        provider: Arc<dyn PaymentProvider>,
        return_url_base: Option<String>,
    ) -> Self {
        Self {
            store,
            provider,
            return_url_base,
        }
    }

    /// The user with a bound credential, minting a placeholder when the
    /// user pays before submitting a token.
    async fn payer(&self, telegram_id: TelegramId) -> Result<(User, Credential)> {
        let mut user = self.store.ensure_user(telegram_id).await?;
        if let Some(id) = user.credential_id {
            if let Some(credential) = self.store.credential(id).await? {
                return Ok((user, credential));
            }
        }
        let credential = self
            .store
            .insert_credential(&NewCredential::placeholder())
            .await?;
        self.store.bind_credential(user.id, credential.id).await?;
        user.credential_id = Some(credential.id);
        info!(chat = telegram_id.get(), credential_id = credential.id.get(), "placeholder credential minted");
        Ok((user, credential))
    }

    pub async fn create_payment(
        &self,
        telegram_id: TelegramId,
        tariff_code: &str,
    ) -> Result<PaymentOutcome> {
        let Some(tariff) = Tariff::find(tariff_code) else {
            return Ok(PaymentOutcome::failed(format!(
                "Неизвестный тариф: {tariff_code}"
            )));
        };

        let (user, credential) = self.payer(telegram_id).await?;
        let payment = self
            .store
            .insert_payment(&NewPayment {
                user_id: user.id,
                credential_id: credential.id,
                tariff: tariff.code.to_string(),
                amount: tariff.amount,
                currency: tariff.currency.to_string(),
            })
            .await?;

        let request = CheckoutRequest {
            idempotency_key: uuid::Uuid::new_v4().to_string(),
            payment_id: payment.id,
            tariff: tariff.code.to_string(),
            description: tariff.title.to_string(),
            amount: tariff.amount,
            currency: tariff.currency.to_string(),
            return_url: return_url(self.return_url_base.as_deref(), payment.id),
        };

        let created = match self.provider.create_payment(&request).await {
            Ok(created) => created,
            Err(e) => {
                warn!(payment_id = payment.id.get(), error = %e, "checkout creation failed");
                self.store
                    .update_payment(payment.id, None, PaymentStatus::Canceled)
                    .await?;
                return Ok(PaymentOutcome::failed(format!("Ошибка платёжной системы: {e}")));
            }
        };

        self.store
            .update_payment(payment.id, Some(&created.id), created.status)
            .await?;
        info!(
            payment_id = payment.id.get(),
            provider_id = %created.id,
            tariff = tariff.code,
            "checkout created"
        );

        Ok(PaymentOutcome {
            ok: true,
            message: "Платёж создан".to_string(),
            confirmation_url: created.confirmation_url,
            payment_id: Some(payment.id),
        })
    }

    pub async fn refresh_and_activate(&self, payment_id: PaymentId) -> Result<ActivationOutcome> {
        self.refresh_and_activate_at(payment_id, Utc::now()).await
    }

    pub async fn refresh_and_activate_at(
        &self,
        payment_id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<ActivationOutcome> {
        let Some(payment) = self.store.payment(payment_id).await? else {
            return Ok(ActivationOutcome::failed(None, "Платёж не найден"));
        };

        if payment.status == PaymentStatus::Succeeded {
            return self.already_active(payment.credential_id).await;
        }

        let Some(provider_id) = payment.provider_payment_id.as_deref() else {
            return Ok(ActivationOutcome::failed(
                Some(payment.status),
                "Платёж не был создан в платёжной системе",
            ));
        };

        let remote = match self.provider.fetch_payment(provider_id).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(payment_id = payment_id.get(), error = %e, "payment status lookup failed");
                return Ok(ActivationOutcome::failed(
                    None,
                    format!("Ошибка запроса статуса платежа: {e}"),
                ));
            }
        };

        match remote.status {
            PaymentStatus::Succeeded => {}
            PaymentStatus::Canceled => {
                self.store
                    .update_payment(payment_id, None, PaymentStatus::Canceled)
                    .await?;
                return Ok(ActivationOutcome::failed(
                    Some(PaymentStatus::Canceled),
                    "Оплата отменена.",
                ));
            }
            pending => {
                self.store.update_payment(payment_id, None, pending).await?;
                return Ok(ActivationOutcome {
                    ok: true,
                    status: Some(pending),
                    message: "Платёж ещё не завершён.".to_string(),
                    role: None,
                    valid_until: None,
                });
            }
        }

        let Some(tariff) = Tariff::find(&payment.tariff) else {
            return Ok(ActivationOutcome::failed(
                Some(remote.status),
                format!("Неизвестный тариф: {}", payment.tariff),
            ));
        };
        let Some(credential) = self.store.credential(payment.credential_id).await? else {
            return Ok(ActivationOutcome::failed(
                Some(remote.status),
                "Токен для платежа не найден",
            ));
        };

        let Some(until) = self
            .store
            .complete_payment(payment_id, tariff.role, tariff.days, now)
            .await?
        else {
            return self.already_active(payment.credential_id).await;
        };

        info!(
            payment_id = payment_id.get(),
            credential_id = credential.id.get(),
            role = %tariff.role,
            until = %until,
            "subscription activated"
        );
        Ok(ActivationOutcome {
            ok: true,
            status: Some(PaymentStatus::Succeeded),
            message: "Оплата получена. Подписка активирована.".to_string(),
            role: Some(tariff.role),
            valid_until: Some(until),
        })
    }

    async fn already_active(&self, credential_id: CredentialId) -> Result<ActivationOutcome> {
        let credential = self.store.credential(credential_id).await?;
        Ok(ActivationOutcome {
            ok: true,
            status: Some(PaymentStatus::Succeeded),
            message: "Подписка уже активна".to_string(),
            role: credential.as_ref().map(|c| c.role),
            valid_until: credential.and_then(|c| c.subscription_until),
        })
    }
}
