//! Periodic deletion of old order, sale and report history.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Months, Utc};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::port::outbound::store::{RetentionReport, RetentionSweeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub keep_months: u32,
    pub batch_size: usize,
    /// Wall-clock budget for one sweep.
    pub budget: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_months: 6,
            batch_size: 5_000,
            budget: Duration::from_secs(600),
        }
    }
}

impl RetentionPolicy {
    /// Rows dated before this are deleted.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_months(Months::new(self.keep_months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

pub struct RetentionService<R> {
    sweeper: Arc<R>,
    policy: RetentionPolicy,
}

impl<R: RetentionSweeper> RetentionService<R> {
    pub fn new(sweeper: Arc<R>, policy: RetentionPolicy) -> Self {
        Self { sweeper, policy }
    }

    pub async fn run(&self) -> Result<RetentionReport> {
        self.run_at(Utc::now()).await
    }

    /// Sweep on the blocking pool so bulk deletes never stall the pollers.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RetentionReport> {
        let cutoff = self.policy.cutoff(now);
        let sweeper = Arc::clone(&self.sweeper);
        let RetentionPolicy {
            batch_size, budget, ..
        } = self.policy;

        let report = tokio::task::spawn_blocking(move || sweeper.sweep(cutoff, batch_size, budget))
            .await
            .map_err(|e| Error::Database(format!("retention task failed: {e}")))??;

        if report.timed_out {
            warn!(
                deleted = report.total(),
                budget_secs = budget.as_secs(),
                "retention sweep ran out of time, rest deferred"
            );
        } else {
            info!(
                orders = report.orders_deleted,
                sales = report.sales_deleted,
                report_lines = report.report_lines_deleted,
                cutoff = %cutoff,
                "retention sweep finished"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::domain::CredentialId;
    use crate::port::outbound::store::RecordStore;
    use crate::testkit::builders;
    use crate::testkit::store::store_with_credentials;

    #[test]
    fn cutoff_is_calendar_months_back() {
        let now = Utc.with_ymd_and_hms(2025, 8, 31, 10, 0, 0).unwrap();
        let cutoff = RetentionPolicy::default().cutoff(now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 2, 28, 10, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn sweep_removes_only_old_rows() {
        let store = Arc::new(store_with_credentials(2).await);
        let credential = CredentialId::new(1);
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        let old = now - chrono::Duration::days(200);
        let recent = now - chrono::Duration::days(3);

        store
            .merge_orders(vec![
                builders::order(credential, "old-1", old),
                builders::order(credential, "old-2", old),
                builders::order(credential, "new-1", recent),
            ])
            .await
            .unwrap();
        store
            .merge_sales(vec![builders::sale(credential, "S-old", old)])
            .await
            .unwrap();

        let service = RetentionService::new(
            store.clone(),
            RetentionPolicy {
                batch_size: 1,
                ..RetentionPolicy::default()
            },
        );
        let report = service.run_at(now).await.unwrap();
        assert_eq!(report.orders_deleted, 2);
        assert_eq!(report.sales_deleted, 1);
        assert!(!report.timed_out);

        let again = service.run_at(now).await.unwrap();
        assert_eq!(again.total(), 0);
    }
}
