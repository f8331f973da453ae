//! Metric helpers for `halflink`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, histogram};

use crate::{error::Fault, frame::BoundaryKind};

/// Name of the counter tracking completed frames.
pub const FRAMES_RECEIVED: &str = "halflink_frames_received_total";
/// Name of the counter tracking NACK retransmissions.
pub const RETRANSMISSIONS: &str = "halflink_retransmissions_total";
/// Name of the counter tracking successful reconnects.
pub const RECONNECTS: &str = "halflink_reconnects_total";
/// Name of the counter tracking observed faults.
pub const FAULTS: &str = "halflink_faults_total";
/// Name of the counter tracking finished items.
pub const ITEMS: &str = "halflink_items_total";
/// Name of the histogram of final-attempt response times in milliseconds.
pub const RESPONSE_TIME_MS: &str = "halflink_response_time_ms";

/// Final state of one item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The item was delivered.
    Succeeded,
    /// The item was given up.
    Abandoned,
}

impl Outcome {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Abandoned => "abandoned",
        }
    }
}

/// Record a completed frame.
pub fn inc_frames(boundary: BoundaryKind) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_RECEIVED, "boundary" => boundary.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = boundary;
}

/// Record a NACK retransmission.
pub fn inc_retransmissions() {
    #[cfg(feature = "metrics")]
    counter!(RETRANSMISSIONS).increment(1);
}

/// Record a successful reconnect.
pub fn inc_reconnects() {
    #[cfg(feature = "metrics")]
    counter!(RECONNECTS).increment(1);
}

/// Record a fault occurrence.
pub fn inc_faults(fault: &Fault) {
    #[cfg(feature = "metrics")]
    counter!(FAULTS, "fault" => fault.label()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = fault;
}

/// Record a finished item.
pub fn inc_items(outcome: Outcome) {
    #[cfg(feature = "metrics")]
    counter!(ITEMS, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Record the response time of a successful item.
#[cfg_attr(
    feature = "metrics",
    expect(
        clippy::cast_precision_loss,
        reason = "response times are far below 2^52 ms"
    )
)]
pub fn record_response_time(millis: i64) {
    #[cfg(feature = "metrics")]
    histogram!(RESPONSE_TIME_MS).record(millis as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = millis;
}
