//! Figures shown alongside order and sale notifications.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;

use super::time::{from_marketplace_local, to_marketplace_local};

/// Days in the trailing sales window.
pub const TRAILING_DAYS: u32 = 90;

/// Midnight of the current marketplace (Moscow) day, as UTC.
#[must_use]
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    from_marketplace_local(to_marketplace_local(now).date().and_time(NaiveTime::MIN))
}

/// Start of the trailing window ending at `now`.
#[must_use]
pub fn trailing_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(i64::from(TRAILING_DAYS))
}

/// Per-article activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    pub today: i64,
    pub trailing: i64,
}

/// Price after the marketplace's buyer discount (SPP, percent).
#[must_use]
pub fn discounted_price(price: Decimal, spp_percent: Decimal) -> Decimal {
    price - price * spp_percent / Decimal::ONE_HUNDRED
}

/// Days the current stock lasts at the trailing average daily rate.
///
/// Zero when there was no activity in the window.
#[must_use]
pub fn days_of_coverage(total_stock: i64, trailing_count: i64, window_days: u32) -> f64 {
    if trailing_count <= 0 || window_days == 0 {
        return 0.0;
    }
    let per_day = trailing_count as f64 / f64::from(window_days);
    total_stock as f64 / per_day
}
