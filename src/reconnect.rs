//! Reconnect policy and back-off timing.
//!
//! A transport drop is session-local: the in-flight frame is already gone,
//! so recovery only has to replace the transport. [`ReconnectPolicy`] closes
//! the old handle, then dials and handshakes a fresh one, retrying with
//! exponential back-off until the configured attempts are spent.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::{
    config::ReconnectConfig,
    error::Fault,
    session::{Handshake, establish},
    transport::{Dialer, Transport},
};

/// Configuration for exponential back-off between reconnect attempts.
///
/// The delay starts at `initial_delay` and doubles after each failed
/// attempt, capped at `max_delay`.
///
/// # Default Values
/// - `initial_delay`: 10 milliseconds
/// - `max_delay`: 1 second
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for the delay once it has grown.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl BackoffConfig {
    /// Clamp delays to at least one millisecond and ensure
    /// `initial_delay <= max_delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use halflink::reconnect::BackoffConfig;
    ///
    /// let cfg = BackoffConfig {
    ///     initial_delay: Duration::from_millis(5),
    ///     max_delay: Duration::ZERO,
    /// };
    ///
    /// let normalized = cfg.normalized();
    /// assert_eq!(normalized.initial_delay, Duration::from_millis(1));
    /// assert_eq!(normalized.max_delay, Duration::from_millis(5));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.initial_delay = self.initial_delay.max(Duration::from_millis(1));
        self.max_delay = self.max_delay.max(Duration::from_millis(1));
        if self.initial_delay > self.max_delay {
            std::mem::swap(&mut self.initial_delay, &mut self.max_delay);
        }
        self
    }

    /// Delay following `current`, doubled and capped.
    #[must_use]
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

/// Replaces a dropped transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
}

impl ReconnectPolicy {
    /// Create a policy from `config`, normalising its back-off.
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        let config = config.backoff(config.backoff.normalized());
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ReconnectConfig { &self.config }

    /// Close `old` and establish a fresh transport.
    ///
    /// The old handle is always closed before any dial is attempted, so two
    /// transports are never live at once.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::ReconnectFailure`] carrying the final
    /// [`ConnectError`](crate::error::ConnectError) once every attempt has
    /// failed. This fault is terminal for the run.
    pub async fn recover<D>(
        &self,
        dialer: &D,
        handshake: &Handshake,
        old: Option<D::Transport>,
    ) -> Result<D::Transport, Fault>
    where
        D: Dialer + ?Sized,
    {
        if let Some(mut transport) = old {
            transport.close().await;
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut delay = self.config.backoff.initial_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match establish(dialer, &self.config.params, handshake).await {
                Ok(transport) => {
                    tracing::info!(attempt, speed = self.config.params.speed, "reconnected");
                    return Ok(transport);
                }
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!(attempt, error = %e, "reconnect attempt failed; giving up");
                    return Err(Fault::ReconnectFailure {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, retry_in = ?delay, "reconnect attempt failed");
                    sleep(delay).await;
                    delay = self.config.backoff.next_delay(delay);
                }
            }
        }
    }
}
