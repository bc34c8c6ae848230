//! Daily activity report sent as a document to opted-in users.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::application::notify::DispatchReport;
use crate::domain::report::MAX_DOCUMENT_BYTES;
use crate::domain::CredentialId;
use crate::error::Result;
use crate::port::outbound::report::ReportRenderer;
use crate::port::outbound::store::{RecordStore, UserStore};
use crate::port::outbound::transport::ChatTransport;

const CAPTION: &str = "Ежедневный отчёт за последние 24 часа";
const TOO_LARGE: &str = "Отчёт слишком большой.";

pub struct DailyReporter<S> {
    store: Arc<S>,
    transport: Arc<dyn ChatTransport>,
    renderer: Arc<dyn ReportRenderer>,
}

impl<S> DailyReporter<S>
where
    S: UserStore + RecordStore,
{
    pub fn new(
        store: Arc<S>,
        transport: Arc<dyn ChatTransport>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            store,
            transport,
            renderer,
        }
    }

    pub async fn send_all(&self) -> Result<DispatchReport> {
        self.send_all_at(Utc::now()).await
    }

    /// Render the last 24 hours once per credential and send it to every
    /// recipient bound to that credential.
    pub async fn send_all_at(&self, now: DateTime<Utc>) -> Result<DispatchReport> {
        let recipients = self.store.daily_report_recipients().await?;
        let from = now - Duration::hours(24);
        let mut rendered: HashMap<CredentialId, Option<Vec<u8>>> = HashMap::new();
        let mut report = DispatchReport::default();

        for user in recipients {
            let Some(credential_id) = user.credential_id else {
                continue;
            };
            if !rendered.contains_key(&credential_id) {
                let document = match self.render(credential_id, from, now).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        warn!(credential_id = credential_id.get(), error = %e, "daily report failed to render");
                        None
                    }
                };
                rendered.insert(credential_id, document);
            }
            let Some(Some(bytes)) = rendered.get(&credential_id) else {
                continue;
            };

            let sent = if bytes.len() > MAX_DOCUMENT_BYTES {
                self.transport.send_message(user.telegram_id, TOO_LARGE).await
            } else {
                self.transport
                    .send_document(
                        user.telegram_id,
                        self.renderer.file_name(),
                        bytes.clone(),
                        CAPTION,
                    )
                    .await
            };
            if let Err(e) = &sent {
                warn!(chat = user.telegram_id.get(), error = %e, "daily report delivery failed");
            }
            report.delivered += usize::from(sent.is_ok());
            report.failed += usize::from(sent.is_err());
        }

        info!(
            credentials = rendered.len(),
            delivered = report.delivered,
            failed = report.failed,
            "daily reports sent"
        );
        Ok(report)
    }

    async fn render(
        &self,
        credential_id: CredentialId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let snapshot = self.store.daily_snapshot(credential_id, from, to).await?;
        self.renderer.render(&snapshot)
    }
}
