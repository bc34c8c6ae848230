//! Periodic jobs: polling with dispatch, report import, daily reports,
//! expiry warnings, catalog refresh and retention.
//!
//! Every job runs inside one task, so a slow cycle delays the next tick
//! rather than overlapping it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{error, info};

use crate::application::daily_report::DailyReporter;
use crate::application::expiry::ExpiryNotifier;
use crate::application::notify::{DispatchReport, Dispatcher};
use crate::application::products::ProductCatalog;
use crate::application::retention::{RetentionPolicy, RetentionService};
use crate::application::sync::{Pollers, ReportSync, SyncDomain, SyncWindows, REPORT_PERIOD_DAYS};
use crate::error::Result;
use crate::port::outbound::gateway::StatisticsGateway;
use crate::port::outbound::report::ReportRenderer;
use crate::port::outbound::store::{RetentionSweeper, Store};
use crate::port::outbound::transport::ChatTransport;

/// How often each job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Orders, sales, stocks and incomes, polled in that order.
    pub records: Duration,
    pub coefficients: Duration,
    pub report_sync: Duration,
    pub daily_report: Duration,
    pub expiry: Duration,
    pub products: Duration,
    pub retention: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        const DAY: Duration = Duration::from_secs(24 * 3600);
        Self {
            records: Duration::from_secs(60),
            coefficients: Duration::from_secs(300),
            report_sync: Duration::from_secs(6 * 3600),
            daily_report: DAY,
            expiry: DAY,
            products: DAY,
            retention: DAY,
        }
    }
}

/// Everything the scheduler tunes beyond its collaborators.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub schedule: Schedule,
    pub windows: SyncWindows,
    pub retention: RetentionPolicy,
    pub report_period: chrono::Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            schedule: Schedule::default(),
            windows: SyncWindows::default(),
            retention: RetentionPolicy::default(),
            report_period: chrono::Duration::days(REPORT_PERIOD_DAYS),
        }
    }
}

pub struct Scheduler<S> {
    pollers: Pollers<S>,
    dispatcher: Dispatcher<S>,
    report_sync: ReportSync<S>,
    daily: DailyReporter<S>,
    expiry: ExpiryNotifier<S>,
    catalog: Arc<ProductCatalog<S>>,
    retention: RetentionService<S>,
    schedule: Schedule,
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

impl<S> Scheduler<S>
where
    S: Store + RetentionSweeper,
{
    pub fn new(
        store: Arc<S>,
        gateway: Arc<dyn StatisticsGateway>,
        transport: Arc<dyn ChatTransport>,
        renderer: Arc<dyn ReportRenderer>,
        catalog: Arc<ProductCatalog<S>>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            pollers: Pollers::new(&store, &gateway, &catalog, settings.windows, Utc::now()),
            dispatcher: Dispatcher::new(Arc::clone(&store), Arc::clone(&transport)),
            report_sync: ReportSync::new(Arc::clone(&store), gateway, settings.report_period),
            daily: DailyReporter::new(Arc::clone(&store), Arc::clone(&transport), renderer),
            expiry: ExpiryNotifier::new(Arc::clone(&store), transport),
            retention: RetentionService::new(store, settings.retention),
            catalog,
            schedule: settings.schedule,
        }
    }

    /// Poll one domain and notify about what changed.
    pub async fn sync_domain(&self, domain: SyncDomain) -> Result<DispatchReport> {
        let now = Utc::now();
        let changed = self.pollers.poll(domain, now).await?;
        if changed.is_empty() {
            return Ok(DispatchReport::default());
        }
        info!(domain = %domain, changed = changed.len(), "changes detected");
        Ok(self.dispatcher.notify_at(changed, now).await)
    }

    async fn sync_records(&self) {
        for domain in [
            SyncDomain::Orders,
            SyncDomain::Sales,
            SyncDomain::Stocks,
            SyncDomain::Incomes,
        ] {
            if let Err(e) = self.sync_domain(domain).await {
                error!(domain = %domain, error = %e, "sync cycle failed");
            }
        }
    }

    /// Run every job until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut records = ticker(self.schedule.records);
        let mut coefficients = ticker(self.schedule.coefficients);
        let mut report_sync = ticker(self.schedule.report_sync);
        let mut daily = ticker(self.schedule.daily_report);
        let mut expiry = ticker(self.schedule.expiry);
        let mut products = ticker(self.schedule.products);
        let mut retention = ticker(self.schedule.retention);

        // The first daily tick fires at startup; skip it so a restart does
        // not resend the report.
        daily.tick().await;

        info!("scheduler started");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler stopping");
                        break;
                    }
                }
                _ = records.tick() => self.sync_records().await,
                _ = coefficients.tick() => {
                    if let Err(e) = self.sync_domain(SyncDomain::Coefficients).await {
                        error!(error = %e, "coefficient cycle failed");
                    }
                }
                _ = report_sync.tick() => {
                    if let Err(e) = self.report_sync.sync_at(Utc::now()).await {
                        error!(error = %e, "report import failed");
                    }
                }
                _ = daily.tick() => {
                    if let Err(e) = self.daily.send_all().await {
                        error!(error = %e, "daily report job failed");
                    }
                }
                _ = expiry.tick() => {
                    if let Err(e) = self.expiry.warn_expiring().await {
                        error!(error = %e, "expiry warning job failed");
                    }
                }
                _ = products.tick() => {
                    if let Err(e) = self.catalog.refresh_stale(Utc::now()).await {
                        error!(error = %e, "catalog refresh failed");
                    }
                }
                _ = retention.tick() => {
                    if let Err(e) = self.retention.run().await {
                        error!(error = %e, "retention sweep failed");
                    }
                }
            }
        }
    }
}
