//! Polling cadence and trailing windows.

use std::time::Duration;

use serde::Deserialize;

use crate::application::scheduler::Schedule;
use crate::application::sync::{SyncWindows, REPORT_PERIOD_DAYS};

/// `[sync]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Orders, sales, stocks and incomes.
    pub records_interval_secs: u64,
    pub coefficients_interval_secs: u64,
    pub report_interval_secs: u64,
    pub orders_lookback_days: i64,
    pub sales_lookback_days: i64,
    pub stocks_lookback_days: i64,
    pub incomes_lookback_days: i64,
    /// How far behind "now" the watermark starts after a restart.
    pub initial_lag_minutes: i64,
    /// Days of realization report imported per cycle.
    pub report_period_days: i64,
}

impl SyncConfig {
    #[must_use]
    pub fn windows(&self) -> SyncWindows {
        SyncWindows {
            orders: chrono::Duration::days(self.orders_lookback_days),
            sales: chrono::Duration::days(self.sales_lookback_days),
            stocks: chrono::Duration::days(self.stocks_lookback_days),
            incomes: chrono::Duration::days(self.incomes_lookback_days),
            initial_lag: chrono::Duration::minutes(self.initial_lag_minutes),
        }
    }

    /// Poll intervals layered over the daily job defaults.
    #[must_use]
    pub fn schedule(&self) -> Schedule {
        Schedule {
            records: Duration::from_secs(self.records_interval_secs),
            coefficients: Duration::from_secs(self.coefficients_interval_secs),
            report_sync: Duration::from_secs(self.report_interval_secs),
            ..Schedule::default()
        }
    }

    #[must_use]
    pub fn report_period(&self) -> chrono::Duration {
        chrono::Duration::days(self.report_period_days)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        let windows = SyncWindows::default();
        let schedule = Schedule::default();
        Self {
            records_interval_secs: schedule.records.as_secs(),
            coefficients_interval_secs: schedule.coefficients.as_secs(),
            report_interval_secs: schedule.report_sync.as_secs(),
            orders_lookback_days: windows.orders.num_days(),
            sales_lookback_days: windows.sales.num_days(),
            stocks_lookback_days: windows.stocks.num_days(),
            incomes_lookback_days: windows.incomes.num_days(),
            initial_lag_minutes: windows.initial_lag.num_minutes(),
            report_period_days: REPORT_PERIOD_DAYS,
        }
    }
}
