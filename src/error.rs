//! Fault taxonomy for the link engine.
//!
//! Every failure the engine can observe is a [`Fault`]. Faults differ in how
//! far they propagate, and [`Fault::recovery_policy`] maps each one onto the
//! [`RecoveryPolicy`] the retransmission controller applies:
//!
//! - [`RecoveryPolicy::Retransmit`]: item-local, repaired by a NACK re-request.
//! - [`RecoveryPolicy::Reconnect`]: session-local, repaired by redialling.
//! - [`RecoveryPolicy::Abort`]: terminal for the remaining item sequence.

use std::io;

use thiserror::Error;

/// Why a transport stopped delivering bytes mid-frame.
#[derive(Debug, Error)]
pub enum DropCause {
    /// No byte arrived within the configured read timeout.
    #[error("read timed out")]
    Timeout,
    /// The transport reported an I/O failure.
    #[error("read failed: {0}")]
    Io(#[source] io::Error),
}

/// Structural defects that make a frame impossible to interpret.
///
/// Retrying cannot repair these, so they are never treated as a checksum
/// mismatch.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MalformedFrame {
    /// The frame carries no `<` marker opening the payload field.
    #[error("payload marker not found")]
    MissingPayloadMarker,

    /// The payload region extends past the end of the frame.
    #[error("payload too short: have {have} bytes, need {need}")]
    PayloadTooShort {
        /// Bytes available from the payload offset onwards.
        have: usize,
        /// Bytes the layout declares.
        need: usize,
    },

    /// The checksum field is absent or does not start with a decimal digit.
    #[error("checksum field is not a decimal number")]
    InvalidChecksumField,

    /// More bytes arrived than the accumulator is allowed to buffer.
    #[error("frame exceeds max length: {size} > {max}")]
    Oversized {
        /// Bytes received when the limit tripped.
        size: usize,
        /// Configured maximum.
        max: usize,
    },
}

/// Failures while bringing a link into data mode.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The dialer could not produce a transport.
    #[error("dial failed: {0}")]
    Dial(#[source] io::Error),
    /// The transport refused to enter the requested mode.
    #[error("transport rejected mode {mode:?}")]
    OpenRejected {
        /// Mode string passed to `open`.
        mode: String,
    },
    /// The server greeting never completed.
    #[error("greeting incomplete: {0}")]
    Greeting(#[source] DropCause),
    /// The server greeting could not be framed.
    #[error("greeting malformed: {0}")]
    MalformedGreeting(#[source] MalformedFrame),
    /// The greeting read failed for a reason other than a drop or bad framing.
    #[error("greeting failed: {0}")]
    GreetingFault(#[source] Box<Fault>),
    /// The session no longer holds a transport.
    #[error("session is closed")]
    Closed,
}

/// Top-level fault surfaced by the engine.
#[derive(Debug, Error)]
pub enum Fault {
    /// `write` returned false; fatal at this layer.
    #[error("transport refused to send request {code:?}")]
    TransportSendFailure {
        /// Request code that could not be written.
        code: String,
    },

    /// Timeout or read error mid-frame; the partial frame was discarded.
    #[error("transport dropped after {bytes_discarded} buffered bytes: {cause}")]
    TransportDrop {
        /// Bytes thrown away with the partial frame.
        bytes_discarded: usize,
        /// Underlying signal.
        #[source]
        cause: DropCause,
    },

    /// The initial connection could not be established.
    #[error("connect failed: {0}")]
    ConnectFailure(#[source] ConnectError),

    /// Every reconnect cycle failed; terminal for the whole run.
    #[error("reconnect failed after {attempts} attempt(s): {last}")]
    ReconnectFailure {
        /// Dial cycles attempted.
        attempts: u32,
        /// Failure of the final cycle.
        #[source]
        last: ConnectError,
    },

    /// Declared and computed checksums disagree.
    #[error("checksum mismatch: computed {computed}, declared {declared}")]
    ChecksumMismatch {
        /// XOR computed over the payload.
        computed: u8,
        /// Value carried by the frame.
        declared: u32,
    },

    /// The frame is structurally unusable.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] MalformedFrame),

    /// The configured retransmission cap was exceeded.
    #[error("gave up after {attempts} retransmission(s)")]
    RetryLimitExceeded {
        /// Retransmissions issued for the item.
        attempts: u32,
    },

    /// The caller cancelled the run between items.
    #[error("run cancelled")]
    Cancelled,
}

/// How the retransmission controller responds to a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Discard the frame and re-request it with the negative code.
    Retransmit,
    /// Discard the frame, redial, and re-request with the same code.
    Reconnect,
    /// Stop the item and the remaining run.
    Abort,
}

impl RecoveryPolicy {
    /// Returns the policy name as a static string for metrics and logging.
    ///
    /// # Examples
    ///
    /// ```
    /// use halflink::error::RecoveryPolicy;
    ///
    /// assert_eq!(RecoveryPolicy::Retransmit.as_str(), "retransmit");
    /// assert_eq!(RecoveryPolicy::Abort.as_str(), "abort");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Retransmit => "retransmit",
            Self::Reconnect => "reconnect",
            Self::Abort => "abort",
        }
    }
}

impl Fault {
    /// Default recovery policy for this fault.
    #[must_use]
    pub fn recovery_policy(&self) -> RecoveryPolicy {
        match self {
            Self::ChecksumMismatch { .. } => RecoveryPolicy::Retransmit,
            Self::TransportDrop { .. } => RecoveryPolicy::Reconnect,
            Self::TransportSendFailure { .. }
            | Self::ConnectFailure(_)
            | Self::ReconnectFailure { .. }
            | Self::MalformedFrame(_)
            | Self::RetryLimitExceeded { .. }
            | Self::Cancelled => RecoveryPolicy::Abort,
        }
    }

    /// Short label used as a metrics dimension.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TransportSendFailure { .. } => "send_failure",
            Self::TransportDrop { .. } => "transport_drop",
            Self::ConnectFailure(_) => "connect_failure",
            Self::ReconnectFailure { .. } => "reconnect_failure",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
            Self::MalformedFrame(_) => "malformed_frame",
            Self::RetryLimitExceeded { .. } => "retry_limit",
            Self::Cancelled => "cancelled",
        }
    }
}
