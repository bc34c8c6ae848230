//! Old-row cleanup limits.

use std::time::Duration;

use serde::Deserialize;

use crate::application::retention::RetentionPolicy;

/// `[retention]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub keep_months: u32,
    pub batch_size: usize,
    pub time_limit_secs: u64,
}

impl RetentionConfig {
    #[must_use]
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            keep_months: self.keep_months,
            batch_size: self.batch_size,
            budget: Duration::from_secs(self.time_limit_secs),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        let policy = RetentionPolicy::default();
        Self {
            keep_months: policy.keep_months,
            batch_size: policy.batch_size,
            time_limit_secs: policy.budget.as_secs(),
        }
    }
}
