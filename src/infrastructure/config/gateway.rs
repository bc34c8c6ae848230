//! Marketplace API endpoints and timeouts.

use std::time::Duration;

use serde::Deserialize;

use crate::adapter::outbound::wildberries::{
    DEFAULT_CARD_URL, DEFAULT_STATISTICS_URL, DEFAULT_SUPPLIES_URL,
};
use crate::port::outbound::gateway::REPORT_PAGE_LIMIT;

/// `[gateway]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub statistics_url: String,
    pub supplies_url: String,
    /// Public product card endpoint used for enrichment.
    pub card_url: String,
    pub timeout_secs: u64,
    /// Attempts on HTTP 429 from the realization report.
    pub report_attempts: u32,
    pub report_backoff_secs: u64,
    /// Rows per realization report page.
    pub report_page_limit: u32,
}

impl GatewayConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn report_backoff(&self) -> Duration {
        Duration::from_secs(self.report_backoff_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            statistics_url: DEFAULT_STATISTICS_URL.to_string(),
            supplies_url: DEFAULT_SUPPLIES_URL.to_string(),
            card_url: DEFAULT_CARD_URL.to_string(),
            timeout_secs: 30,
            report_attempts: 3,
            report_backoff_secs: 60,
            report_page_limit: REPORT_PAGE_LIMIT,
        }
    }
}
