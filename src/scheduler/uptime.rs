//! Rolling-window uptime aggregation.

use crate::db::{CheckRecord, DbError, MonitorStore};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;

/// Default trailing window for uptime: 90 days.
pub const DEFAULT_WINDOW_DAYS: i64 = 90;

/// Percentage of `up` out of `total`, rounded to two decimals.
///
/// Rounds half away from zero and works in hundredths of a percent with
/// integer arithmetic, so 1 of 32 is 3.13 and 2 of 3 is 66.67 exactly.
pub fn percentage(up: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let up = up as u128;
    let total = total as u128;
    let hundredths = (up * 20_000 + total) / (2 * total);
    hundredths as f64 / 100.0
}

/// Uptime over a slice of check records, or None if the slice is empty.
pub fn uptime_percentage(checks: &[CheckRecord]) -> Option<f64> {
    if checks.is_empty() {
        return None;
    }
    let up = checks.iter().filter(|c| c.is_up).count();
    Some(percentage(up, checks.len()))
}

/// Computes uptime for an endpoint from the stored check log.
#[derive(Clone)]
pub struct UptimeAggregator {
    store: Arc<dyn MonitorStore>,
    window: ChronoDuration,
}

impl UptimeAggregator {
    pub fn new(store: Arc<dyn MonitorStore>, window: ChronoDuration) -> Self {
        Self { store, window }
    }

    pub fn window(&self) -> ChronoDuration {
        self.window
    }

    /// Uptime over the window ending at `as_of`.
    ///
    /// With no records in the window the result falls back to the current
    /// probe: 100.0 if it was up, 0.0 otherwise.
    pub fn compute_uptime(
        &self,
        endpoint_id: i64,
        current_is_up: bool,
        as_of: DateTime<Utc>,
    ) -> Result<f64, DbError> {
        let start = as_of
            .checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let checks = self.store.checks_between(endpoint_id, start, as_of)?;

        Ok(uptime_percentage(&checks).unwrap_or(if current_is_up { 100.0 } else { 0.0 }))
    }
}
