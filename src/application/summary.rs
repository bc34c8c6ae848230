//! On-demand order summaries over a preset history depth.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::application::gate::{Access, RoleGate};
use crate::domain::report::{summarize, MAX_DOCUMENT_BYTES};
use crate::domain::TelegramId;
use crate::error::Result;
use crate::port::outbound::report::ReportRenderer;
use crate::port::outbound::store::{CredentialStore, RecordStore, UserStore};
use crate::port::outbound::transport::ChatTransport;

/// What a summary request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// The document went out.
    Sent { articles: usize },
    NoCredential,
    Denied(String),
    Empty,
    TooLarge,
}

impl SummaryOutcome {
    /// Reply text for outcomes that did not send a document.
    #[must_use]
    pub fn message(&self, days: u32) -> Option<String> {
        match self {
            Self::Sent { .. } => None,
            Self::NoCredential => {
                Some("Нет привязанного токена. Сначала /start и пришлите токен.".to_string())
            }
            Self::Denied(reason) => Some(reason.clone()),
            Self::Empty => Some(format!("За {days} дней заказов нет.")),
            Self::TooLarge => {
                Some("Извините, итоговый файл слишком большой для отправки.".to_string())
            }
        }
    }
}

pub struct SummaryService<S> {
    store: Arc<S>,
    gate: RoleGate<S>,
    transport: Arc<dyn ChatTransport>,
    renderer: Arc<dyn ReportRenderer>,
}

impl<S> SummaryService<S>
where
    S: UserStore + CredentialStore + RecordStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        transport: Arc<dyn ChatTransport>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            gate: RoleGate::new(Arc::clone(&store)),
            store,
            transport,
            renderer,
        }
    }

    pub async fn send(&self, telegram_id: TelegramId, days: u32) -> Result<SummaryOutcome> {
        self.send_at(telegram_id, days, Utc::now()).await
    }

    /// Gate on history depth, then send per-article totals for the last
    /// `days` days as a document.
    pub async fn send_at(
        &self,
        telegram_id: TelegramId,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<SummaryOutcome> {
        let Some(credential_id) = self
            .store
            .user_by_telegram(telegram_id)
            .await?
            .and_then(|user| user.credential_id)
        else {
            return Ok(SummaryOutcome::NoCredential);
        };

        let access = self.gate.check_history(telegram_id, days).await?;
        if let Access::Denied { .. } = access {
            let reason = access.denial_message().unwrap_or_default();
            return Ok(SummaryOutcome::Denied(reason));
        }

        let from = now - Duration::days(i64::from(days));
        let snapshot = self.store.daily_snapshot(credential_id, from, now).await?;
        let rows = summarize(&snapshot);
        if rows.is_empty() {
            return Ok(SummaryOutcome::Empty);
        }

        let bytes = self.renderer.render_summary(&rows)?;
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Ok(SummaryOutcome::TooLarge);
        }
        self.transport
            .send_document(
                telegram_id,
                &format!("orders_{days}d.csv"),
                bytes,
                &format!("Отчёт по заказам за {days} дней."),
            )
            .await?;

        info!(chat = telegram_id.get(), days, articles = rows.len(), "summary sent");
        Ok(SummaryOutcome::Sent {
            articles: rows.len(),
        })
    }
}
