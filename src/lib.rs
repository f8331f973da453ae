#![doc(html_root_url = "https://docs.rs/halflink/latest")]
//! Public API for the `halflink` library.
//!
//! This crate drives a half-duplex, byte-oriented link with strict
//! request/response turn-taking. It accumulates responses byte by byte until
//! a boundary is recognised, validates checksummed payloads, retransmits
//! corrupted frames with ACK/NACK alternation and reconnects after silent
//! timeouts without losing session state.

pub mod accumulator;
pub mod arq;
pub mod checksum;
pub mod codes;
pub mod config;
pub mod decode;
pub mod driver;
pub mod error;
pub mod frame;
pub mod latency;
pub mod metrics;
pub mod reconnect;
pub mod session;
pub mod sink;
pub mod terminator;
pub mod transport;

pub use arq::{ItemRequest, RetransmissionController, RetryRecord};
pub use codes::{RequestCode, RequestCodes};
pub use config::LinkConfig;
pub use driver::{RunError, RunOptions, RunSummary};
pub use error::{Fault, RecoveryPolicy};
pub use frame::{BoundaryKind, Frame};
pub use session::Session;
pub use sink::{Delivery, PayloadKind, Sink};
pub use transport::{Dialer, ReadSignal, Transport};
