//! Link configuration.
//!
//! All types here are plain values with builder-style setters so that a
//! deployment can construct them in code or deserialize them with `serde`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reconnect::BackoffConfig;

/// Minimum frame length in bytes.
///
/// Limits passed to [`LinkConfig::max_frame_length`] are clamped to at least
/// this value.
pub const MIN_FRAME_LENGTH: usize = 64;

/// Maximum frame length in bytes (16 MiB).
pub const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

pub(crate) fn clamp_frame_length(value: usize) -> usize {
    value.clamp(MIN_FRAME_LENGTH, MAX_FRAME_LENGTH)
}

/// Transport-level parameters used when dialling.
///
/// `speed` is passed through to transports that model a line rate; the TCP
/// transport ignores it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkParams {
    /// Line speed in bits per second.
    pub speed: u32,
    /// Longest silence tolerated by a single byte read.
    pub timeout: Duration,
}

impl LinkParams {
    /// Parameters for the initial connection.
    ///
    /// Default: 76000 bps, 10 second read timeout.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            speed: 76_000,
            timeout: Duration::from_secs(10),
        }
    }

    /// Parameters for reconnecting after a drop.
    ///
    /// Default: 80000 bps, 10 second read timeout.
    #[must_use]
    pub const fn reconnect() -> Self {
        Self {
            speed: 80_000,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for LinkParams {
    fn default() -> Self { Self::initial() }
}

/// Retransmission bounds for checksum failures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum NACK retransmissions per item.
    ///
    /// `None` retries until the item succeeds or the transport fails.
    ///
    /// Default: `None`.
    pub max_retransmissions: Option<u32>,
}

impl RetryConfig {
    /// Cap the number of retransmissions per item.
    #[must_use]
    pub fn max_retransmissions(mut self, limit: u32) -> Self {
        self.max_retransmissions = Some(limit);
        self
    }
}

/// Reconnect behaviour after a transport drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Parameters used to dial the replacement transport.
    pub params: LinkParams,
    /// Dial cycles attempted per recovery before giving up.
    ///
    /// Default: 1.
    pub max_attempts: u32,
    /// Drop-and-reconnect cycles tolerated for a single item.
    ///
    /// Default: 3.
    pub max_drops_per_item: u32,
    /// Delay between failed dial cycles.
    pub backoff: BackoffConfig,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            params: LinkParams::reconnect(),
            max_attempts: 1,
            max_drops_per_item: 3,
            backoff: BackoffConfig::default(),
        }
    }
}

impl ReconnectConfig {
    /// Set the parameters used for reconnection.
    #[must_use]
    pub fn params(mut self, params: LinkParams) -> Self {
        self.params = params;
        self
    }

    /// Set the number of dial cycles per recovery (at least one).
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the number of drops tolerated per item.
    #[must_use]
    pub fn max_drops_per_item(mut self, drops: u32) -> Self {
        self.max_drops_per_item = drops;
        self
    }

    /// Set the back-off between dial cycles.
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Complete configuration for a [`Session`](crate::session::Session).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use halflink::config::{LinkConfig, LinkParams, RetryConfig};
///
/// let config = LinkConfig::default()
///     .mode("ITHAKI")
///     .initial(LinkParams { speed: 9600, timeout: Duration::from_secs(5) })
///     .retry(RetryConfig::default().max_retransmissions(50));
///
/// assert_eq!(config.retry.max_retransmissions, Some(50));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Mode string passed to `Transport::open`.
    ///
    /// Default: `ITHAKI`.
    pub mode: String,
    /// Parameters for the initial connection.
    pub initial: LinkParams,
    /// Reconnect behaviour.
    pub reconnect: ReconnectConfig,
    /// Retransmission bounds.
    pub retry: RetryConfig,
    /// Largest frame the accumulator buffers before failing.
    ///
    /// Default: 1 MiB.
    pub max_frame_length: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            mode: "ITHAKI".to_owned(),
            initial: LinkParams::initial(),
            reconnect: ReconnectConfig::default(),
            retry: RetryConfig::default(),
            max_frame_length: 1024 * 1024,
        }
    }
}

impl LinkConfig {
    /// Set the mode string.
    #[must_use]
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Set the initial link parameters.
    #[must_use]
    pub fn initial(mut self, params: LinkParams) -> Self {
        self.initial = params;
        self
    }

    /// Set the reconnect behaviour.
    #[must_use]
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set the retransmission bounds.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the frame length limit, clamped to
    /// [`MIN_FRAME_LENGTH`]..=[`MAX_FRAME_LENGTH`].
    #[must_use]
    pub fn max_frame_length(mut self, length: usize) -> Self {
        self.max_frame_length = clamp_frame_length(length);
        self
    }
}
