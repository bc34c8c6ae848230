//! Report rendering port.

use crate::domain::report::{ArticleSummary, DailySnapshot};
use crate::error::Result;

/// Turns report data into a sendable document.
pub trait ReportRenderer: Send + Sync {
    /// File name for the daily report.
    fn file_name(&self) -> &'static str;

    fn render(&self, snapshot: &DailySnapshot) -> Result<Vec<u8>>;

    /// Per-article totals, one row per article size.
    fn render_summary(&self, rows: &[ArticleSummary]) -> Result<Vec<u8>>;
}
