//! Utilities for driving a [`Session`](halflink::Session) against scripted
//! links during tests.
//!
//! A [`ScriptedTransport`] answers each written request with the next
//! [`Reply`] in its script, one byte per read. Replies can pause, go silent
//! or fail part-way, which is how tests provoke timeouts and drops. A
//! [`ScriptedDialer`] hands out scripted transports in order and records
//! every dial in a shared [`Journal`].
//!
//! ```rust
//! use halflink::{LinkConfig, Session, sink::MemorySink};
//! use halflink_testing::{Journal, Reply, ScriptedDialer, ScriptedTransport, codes, echo_packet};
//!
//! # async fn example() {
//! let journal = Journal::new();
//! let link = ScriptedTransport::new(&journal).reply(Reply::frame(echo_packet(1)));
//! let dialer = ScriptedDialer::new(&journal).link(link);
//! let mut session = Session::start(dialer, codes(), LinkConfig::default())
//!     .await
//!     .expect("session starts");
//! let mut sink = MemorySink::new();
//! session
//!     .run_echo(&mut sink, &Default::default())
//!     .await
//!     .expect("echo delivered");
//! assert_eq!(journal.writes(), ["E0001"]);
//! # }
//! ```

pub mod fixtures;
pub mod metrics;
pub mod payloads;
pub mod transport;

pub use fixtures::{codes, journal, start_session};
pub use payloads::{
    checked_packet,
    corrupt_packet,
    echo_packet,
    gga_sentence,
    jpeg,
    tracking_transmission,
};
pub use transport::{Entries, Journal, Reply, ScriptedDialer, ScriptedTransport, Step};
