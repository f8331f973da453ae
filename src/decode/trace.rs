//! Selection of fixes for a GPS trace image.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{coordinates::TracePoint, nmea::Fix};

/// Limits applied when picking trace points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceOptions {
    /// Minimum UTC time between consecutive picked fixes.
    ///
    /// Default: 10 seconds.
    pub spacing: Duration,
    /// Maximum number of points.
    ///
    /// Default: 10.
    pub max_points: usize,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            spacing: Duration::from_secs(10),
            max_points: 10,
        }
    }
}

/// Pick trace points from `fixes` in arrival order.
///
/// The first usable fix is always picked. Each later fix is picked when its
/// UTC time is at least `options.spacing` after the previously picked one.
/// Fixes with an unreadable time or position are skipped.
pub fn select_trace_points<'a, I>(fixes: I, options: &TraceOptions) -> Vec<TracePoint>
where
    I: IntoIterator<Item = &'a Fix>,
{
    let spacing = options.spacing.as_secs();
    let mut picked = Vec::with_capacity(options.max_points);
    let mut last: Option<u32> = None;

    for fix in fixes {
        if picked.len() >= options.max_points {
            break;
        }
        let Some(time) = fix.utc_seconds() else {
            continue;
        };
        if last.is_some_and(|previous| u64::from(time) < u64::from(previous) + spacing) {
            continue;
        }
        match fix.trace_point() {
            Ok(point) => {
                picked.push(point);
                last = Some(time);
            }
            Err(e) => tracing::debug!(error = %e, "skipping fix with invalid position"),
        }
    }
    picked
}
