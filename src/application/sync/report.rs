//! Realization report import.
//!
//! The report is the only source of logistics cost and commission per
//! article, which order and sale notifications quote.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::domain::time::parse_timestamp;
use crate::domain::{CredentialId, NmId, ReportLine};
use crate::error::Result;
use crate::port::outbound::gateway::{RawReportLine, StatisticsGateway};
use crate::port::outbound::store::{CredentialStore, RecordStore};

/// Default period covered by each import.
pub const REPORT_PERIOD_DAYS: i64 = 30;

pub struct ReportSync<S> {
    store: Arc<S>,
    gateway: Arc<dyn StatisticsGateway>,
    period: Duration,
}

impl<S> ReportSync<S>
where
    S: CredentialStore + RecordStore + 'static,
{
    pub fn new(store: Arc<S>, gateway: Arc<dyn StatisticsGateway>, period: Duration) -> Self {
        Self {
            store,
            gateway,
            period,
        }
    }

    /// Import the report for every active credential. Returns rows added.
    pub async fn sync_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let from = now - self.period;
        let mut added = 0;

        for credential in self.store.active_credentials().await? {
            let rows = match self.gateway.full_report(&credential.value, from, now).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(credential_id = credential.id.get(), error = %e, "report fetch failed");
                    continue;
                }
            };
            let lines: Vec<ReportLine> = rows
                .into_iter()
                .filter_map(|row| report_line(row, credential.id))
                .collect();
            match self.store.insert_report_lines(lines).await {
                Ok(count) => added += count,
                Err(e) => {
                    warn!(credential_id = credential.id.get(), error = %e, "report insert failed");
                }
            }
        }

        info!(added, "report import finished");
        Ok(added)
    }
}

/// Rows without an id, article or subject carry no usable figures.
fn report_line(raw: RawReportLine, credential_id: CredentialId) -> Option<ReportLine> {
    let subject_name = raw.subject_name.filter(|s| !s.trim().is_empty())?;
    Some(ReportLine {
        credential_id,
        rrd_id: raw.rrd_id?,
        create_dt: raw.create_dt.as_deref().and_then(parse_timestamp),
        order_dt: raw.order_dt.as_deref().and_then(parse_timestamp),
        subject_name,
        nm_id: NmId::new(raw.nm_id?),
        brand_name: raw.brand_name,
        quantity: raw.quantity.unwrap_or(0),
        retail_price: raw.retail_price.unwrap_or_default(),
        retail_amount: raw.retail_amount.unwrap_or_default(),
        office_name: raw.office_name,
        delivery_amount: raw.delivery_amount.unwrap_or(0),
        return_amount: raw.return_amount.unwrap_or(0),
        delivery_rub: raw.delivery_rub.unwrap_or_default(),
        commission_percent: raw.commission_percent.unwrap_or_default(),
    })
}
