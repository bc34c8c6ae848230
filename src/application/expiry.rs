//! Warnings for subscriptions about to lapse.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::application::notify::{format, DispatchReport};
use crate::error::Result;
use crate::port::outbound::store::{CredentialStore, UserStore};
use crate::port::outbound::transport::ChatTransport;

/// How far ahead an expiry triggers a warning.
pub const WARNING_WINDOW_DAYS: i64 = 3;

pub struct ExpiryNotifier<S> {
    store: Arc<S>,
    transport: Arc<dyn ChatTransport>,
    window: Duration,
}

impl<S> ExpiryNotifier<S>
where
    S: CredentialStore + UserStore,
{
    pub fn new(store: Arc<S>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            store,
            transport,
            window: Duration::days(WARNING_WINDOW_DAYS),
        }
    }

    pub async fn warn_expiring(&self) -> Result<DispatchReport> {
        self.warn_expiring_at(Utc::now()).await
    }

    pub async fn warn_expiring_at(&self, now: DateTime<Utc>) -> Result<DispatchReport> {
        let expiring = self.store.expiring_credentials(now, self.window).await?;
        let mut report = DispatchReport::default();

        for credential in expiring {
            let Some(until) = credential.subscription_until else {
                continue;
            };
            let users = self.store.users_for_credential(credential.id).await?;
            if users.is_empty() {
                continue;
            }
            let text = format::expiry_warning(credential.role, (until - now).num_days(), until);
            for user in users {
                match self.transport.send_message(user.telegram_id, &text).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        warn!(chat = user.telegram_id.get(), error = %e, "expiry warning failed");
                        report.failed += 1;
                    }
                }
            }
        }

        if report.delivered + report.failed > 0 {
            info!(delivered = report.delivered, failed = report.failed, "expiry warnings sent");
        }
        Ok(report)
    }
}
