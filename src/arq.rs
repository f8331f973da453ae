//! Stop-and-wait retransmission controller.
//!
//! [`RetransmissionController::fetch`] drives one item from its first
//! request to success or abandonment:
//!
//! ```text
//! Idle -> Requesting(Positive) -> Accumulating -> Validating -> Success
//!                 ^                    |               |
//!                 |                    | drop          | mismatch
//!                 +--- reconnect <-----+               v
//!                                           Requesting(Negative) -> ...
//! ```
//!
//! Each fault is routed through [`Fault::recovery_policy`]. A checksum
//! mismatch re-requests with the negative code; a transport drop reconnects
//! and re-requests with the code that was in flight; anything else abandons
//! the item. Only one request is ever outstanding.

use std::time::Duration;

use thiserror::Error;
use tracing::{Instrument, field};

use crate::{
    accumulator::FrameAccumulator,
    checksum::EchoLayout,
    codes::RequestCode,
    config::{LinkConfig, RetryConfig},
    error::{Fault, RecoveryPolicy},
    frame::Frame,
    latency::{LatencyTimer, round_millis},
    metrics::{self, Outcome},
    session::Session,
    terminator::Grammar,
    transport::{Dialer, Transport},
};

/// Per-item retry bookkeeping handed to the sink with each delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryRecord {
    /// Negative-code retransmissions issued for the item.
    pub attempts: u32,
    /// Reconnect cycles the item needed.
    pub reconnects: u32,
    /// Latency of the final attempt, rounded to the nearest millisecond.
    pub response_time_ms: i64,
    /// True once a valid frame was received.
    pub succeeded: bool,
}

/// Which request code an attempt sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeRole {
    /// Fresh request (ACK).
    Positive,
    /// Retransmission request (NACK).
    Negative,
}

/// Controller state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ArqState {
    /// No item in flight.
    #[default]
    Idle,
    /// Writing a request with the given code.
    Requesting(CodeRole),
    /// Waiting for the frame boundary.
    Accumulating,
    /// Checking the payload checksum.
    Validating,
    /// The item completed.
    Success,
    /// The item was given up.
    Abandoned,
}

impl ArqState {
    /// State name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting(CodeRole::Positive) => "requesting_ack",
            Self::Requesting(CodeRole::Negative) => "requesting_nack",
            Self::Accumulating => "accumulating",
            Self::Validating => "validating",
            Self::Success => "success",
            Self::Abandoned => "abandoned",
        }
    }
}

/// Everything needed to fetch one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemRequest {
    positive: RequestCode,
    negative: Option<RequestCode>,
    grammar: Grammar,
    validation: Option<EchoLayout>,
}

impl ItemRequest {
    /// Unchecked request: the frame is accepted as soon as it completes.
    #[must_use]
    pub fn plain(code: RequestCode, grammar: Grammar) -> Self {
        Self {
            positive: code,
            negative: None,
            grammar,
            validation: None,
        }
    }

    /// Checksummed echo request alternating `ack` and `nack`.
    #[must_use]
    pub fn checked(ack: RequestCode, nack: RequestCode, layout: EchoLayout) -> Self {
        Self {
            positive: ack,
            negative: Some(nack),
            grammar: Grammar::packet(),
            validation: Some(layout),
        }
    }

    /// Code sent for `role`; unchecked requests always resend the positive
    /// code.
    #[must_use]
    pub fn code_for(&self, role: CodeRole) -> &RequestCode {
        match role {
            CodeRole::Positive => &self.positive,
            CodeRole::Negative => self.negative.as_ref().unwrap_or(&self.positive),
        }
    }

    /// Grammar closing the response.
    #[must_use]
    pub fn grammar(&self) -> &Grammar { &self.grammar }
}

/// A successfully fetched frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchange {
    /// Frame of the final attempt.
    pub frame: Frame,
    /// Retry bookkeeping.
    pub retry: RetryRecord,
}

/// An abandoned item.
#[derive(Debug, Error)]
#[error("item abandoned after {} retransmission(s): {fault}", .retry.attempts)]
pub struct ItemFailure {
    /// Fault that ended the item.
    #[source]
    pub fault: Fault,
    /// Retry bookkeeping up to abandonment.
    pub retry: RetryRecord,
}

/// Drives single items through request, accumulation and validation.
#[derive(Debug)]
pub struct RetransmissionController {
    accumulator: FrameAccumulator,
    timer: LatencyTimer,
    state: ArqState,
    retry: RetryConfig,
    max_drops: u32,
}

impl RetransmissionController {
    /// Create a controller using the limits in `config`.
    #[must_use]
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            accumulator: FrameAccumulator::new(config.max_frame_length),
            timer: LatencyTimer::new(),
            state: ArqState::Idle,
            retry: config.retry,
            max_drops: config.reconnect.max_drops_per_item,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ArqState { self.state }

    /// Fetch one item, retransmitting and reconnecting as required.
    ///
    /// # Errors
    ///
    /// Returns [`ItemFailure`] when the item is abandoned. Any abandonment
    /// is terminal for a multi-item run.
    pub async fn fetch<D: Dialer>(
        &mut self,
        session: &mut Session<D>,
        request: &ItemRequest,
    ) -> Result<Exchange, ItemFailure> {
        let span = tracing::debug_span!(
            "item.fetch",
            code = %request.positive,
            attempts = field::Empty,
        );
        self.run(session, request).instrument(span).await
    }

    async fn run<D: Dialer>(
        &mut self,
        session: &mut Session<D>,
        request: &ItemRequest,
    ) -> Result<Exchange, ItemFailure> {
        self.transition(ArqState::Idle);
        let mut retry = RetryRecord::default();
        let mut role = CodeRole::Positive;
        let mut drops = 0;

        loop {
            let fault = match self.attempt(session, request, role).await {
                Ok((frame, elapsed)) => return Ok(self.succeed(frame, elapsed, retry)),
                Err(fault) => fault,
            };
            metrics::inc_faults(&fault);

            match fault.recovery_policy() {
                RecoveryPolicy::Retransmit => {
                    if let Some(limit) = self.retry.max_retransmissions
                        && retry.attempts >= limit
                    {
                        let fault = Fault::RetryLimitExceeded {
                            attempts: retry.attempts,
                        };
                        return Err(self.abandon(fault, retry));
                    }
                    retry.attempts += 1;
                    metrics::inc_retransmissions();
                    tracing::debug!(attempts = retry.attempts, %fault, "requesting retransmission");
                    role = CodeRole::Negative;
                }
                RecoveryPolicy::Reconnect => {
                    drops += 1;
                    if drops > self.max_drops {
                        return Err(self.abandon(fault, retry));
                    }
                    tracing::warn!(drops, %fault, "transport dropped; reconnecting");
                    if let Err(reconnect) = session.reconnect().await {
                        return Err(self.abandon(reconnect, retry));
                    }
                    retry.reconnects += 1;
                    metrics::inc_reconnects();
                }
                RecoveryPolicy::Abort => return Err(self.abandon(fault, retry)),
            }
        }
    }

    async fn attempt<D: Dialer>(
        &mut self,
        session: &mut Session<D>,
        request: &ItemRequest,
        role: CodeRole,
    ) -> Result<(Frame, Option<Duration>), Fault> {
        let code = request.code_for(role);
        self.transition(ArqState::Requesting(role));
        let transport = session.transport_mut()?;

        self.timer.start();
        if !transport.write(&code.to_wire()).await {
            return Err(Fault::TransportSendFailure {
                code: code.to_string(),
            });
        }

        self.transition(ArqState::Accumulating);
        let frame = self.accumulator.accumulate(transport, &request.grammar).await?;
        let elapsed = self.timer.stop();
        metrics::inc_frames(frame.boundary());

        if let Some(layout) = &request.validation {
            self.transition(ArqState::Validating);
            layout.validate(&frame)?.check()?;
        }
        Ok((frame, elapsed))
    }

    fn succeed(&mut self, frame: Frame, elapsed: Option<Duration>, mut retry: RetryRecord) -> Exchange {
        self.transition(ArqState::Success);
        retry.succeeded = true;
        retry.response_time_ms = elapsed.map_or(0, round_millis);
        metrics::inc_items(Outcome::Succeeded);
        metrics::record_response_time(retry.response_time_ms);
        tracing::Span::current().record("attempts", retry.attempts);
        tracing::debug!(
            attempts = retry.attempts,
            reconnects = retry.reconnects,
            response_time_ms = retry.response_time_ms,
            bytes = frame.len(),
            "item complete"
        );
        Exchange { frame, retry }
    }

    fn abandon(&mut self, fault: Fault, retry: RetryRecord) -> ItemFailure {
        self.transition(ArqState::Abandoned);
        metrics::inc_items(Outcome::Abandoned);
        tracing::Span::current().record("attempts", retry.attempts);
        tracing::error!(
            attempts = retry.attempts,
            reconnects = retry.reconnects,
            policy = fault.recovery_policy().as_str(),
            error = %fault,
            "item abandoned"
        );
        ItemFailure { fault, retry }
    }

    fn transition(&mut self, next: ArqState) {
        tracing::trace!(from = self.state.as_str(), to = next.as_str(), "arq transition");
        self.state = next;
    }
}
