//! Request/response latency measurement.
//!
//! The timer reads the tokio clock so that tests running with a paused
//! runtime observe exact, deterministic durations.

use std::time::Duration;

use tokio::time::Instant;

/// Brackets one request/response exchange.
#[derive(Clone, Copy, Debug, Default)]
pub struct LatencyTimer {
    started: Option<Instant>,
}

impl LatencyTimer {
    /// Create an idle timer.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Capture the send instant, discarding any earlier start.
    pub fn start(&mut self) { self.started = Some(Instant::now()); }

    /// Capture the completion instant and return the elapsed time.
    ///
    /// Returns `None` if the timer was never started. The timer is idle
    /// again afterwards.
    pub fn stop(&mut self) -> Option<Duration> { self.started.take().map(|start| start.elapsed()) }
}

/// Round a duration to the nearest whole millisecond.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use halflink::latency::round_millis;
///
/// assert_eq!(round_millis(Duration::from_micros(1_499)), 1);
/// assert_eq!(round_millis(Duration::from_micros(1_500)), 2);
/// ```
#[must_use]
pub fn round_millis(duration: Duration) -> i64 {
    let millis = (duration.as_nanos() + 500_000) / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn measures_elapsed_time() {
        let mut timer = LatencyTimer::new();
        timer.start();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(timer.stop(), Some(Duration::from_millis(250)));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_discards_earlier_attempt() {
        let mut timer = LatencyTimer::new();
        timer.start();
        tokio::time::sleep(Duration::from_millis(900)).await;
        timer.start();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(timer.stop().map(round_millis), Some(40));
    }

    #[test]
    fn stop_without_start_is_none() {
        assert_eq!(LatencyTimer::new().stop(), None);
    }
}
