//! Timestamp and number parsing for marketplace payloads.
//!
//! The statistics API mixes RFC 3339 timestamps with naive ones, and some
//! numeric fields arrive as decimal-comma strings. Naive values are
//! marketplace local time (Moscow, no DST) and are stored as real UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Marketplace local time offset from UTC.
pub const MARKETPLACE_OFFSET_SECS: i32 = 3 * 3600;

fn offset() -> Duration {
    Duration::seconds(i64::from(MARKETPLACE_OFFSET_SECS))
}

/// Read a naive marketplace wall-clock time as UTC.
#[must_use]
pub fn from_marketplace_local(naive: NaiveDateTime) -> DateTime<Utc> {
    naive.and_utc() - offset()
}

/// Marketplace wall-clock time of a UTC instant.
#[must_use]
pub fn to_marketplace_local(dt: DateTime<Utc>) -> NaiveDateTime {
    dt.naive_utc() + offset()
}

/// Parse a marketplace timestamp. Naive values are Moscow time.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(from_marketplace_local(naive))
}

/// Parse a number that may use a decimal comma (`"18,53"`).
#[must_use]
pub fn parse_lenient_f64(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.replace(',', ".").parse().ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

/// Serde adapter for optional numbers sent as numbers or strings.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::Text(s)) => parse_lenient_f64(&s),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_rfc3339_with_zone() {
        let dt = parse_timestamp("2025-03-12T00:00:00Z").unwrap();
        assert_eq!(dt.day(), 12);

        let dt = parse_timestamp("2025-03-12T03:00:00+03:00").unwrap();
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn parses_naive_and_fractional() {
        let dt = parse_timestamp("2025-01-05T10:15:30").unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (7, 15, 30));
        assert!(parse_timestamp("2025-01-05T10:15:30.123").is_some());
        assert!(parse_timestamp("2025-01-05 10:15:30").is_some());
    }

    #[test]
    fn naive_values_are_moscow_wall_clock() {
        let naive = parse_timestamp("2025-03-10T10:00:00").unwrap();
        let zoned = parse_timestamp("2025-03-10T10:00:00+03:00").unwrap();
        assert_eq!(naive, zoned);
        assert_eq!(
            to_marketplace_local(naive).format("%d.%m.%Y %H:%M").to_string(),
            "10.03.2025 10:00"
        );

        let day = parse_timestamp("2025-03-10").unwrap();
        assert_eq!((day.day(), day.hour()), (9, 21));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn decimal_comma_numbers() {
        assert_eq!(parse_lenient_f64("18,53"), Some(18.53));
        assert_eq!(parse_lenient_f64("195"), Some(195.0));
        assert_eq!(parse_lenient_f64(""), None);
    }

    #[test]
    fn serde_adapter_accepts_both_shapes() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "lenient_f64")]
            value: Option<f64>,
        }

        let row: Row = serde_json::from_str(r#"{"value": "1,5"}"#).unwrap();
        assert_eq!(row.value, Some(1.5));
        let row: Row = serde_json::from_str(r#"{"value": 2}"#).unwrap();
        assert_eq!(row.value, Some(2.0));
        let row: Row = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert_eq!(row.value, None);
        let row: Row = serde_json::from_str("{}").unwrap();
        assert_eq!(row.value, None);
    }
}
