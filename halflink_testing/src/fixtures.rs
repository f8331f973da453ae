//! `rstest` fixtures shared by integration tests.

use halflink::{
    LinkConfig,
    Session,
    codes::{RequestCode, RequestCodes},
};
use rstest::fixture;

use crate::transport::{Journal, ScriptedDialer};

/// Request codes for a typical lab session.
///
/// # Panics
///
/// Never in practice; the literals are valid codes.
#[fixture]
#[allow(
    unused_braces,
    reason = "Clippy is wrong here; this is not a redundant block"
)]
pub fn codes() -> RequestCodes {
    let code = |raw: &str| RequestCode::new(raw).expect("literal code is valid");
    RequestCodes {
        echo: code("E0001"),
        image: code("M0002"),
        image_corrupt: code("G0003"),
        gps: code("P0004"),
        ack: code("Q0005"),
        nack: code("R0006"),
    }
}

/// An empty link journal.
#[fixture]
#[allow(
    unused_braces,
    reason = "Clippy is wrong here; this is not a redundant block"
)]
pub fn journal() -> Journal { Journal::new() }

/// Start a session over `dialer` using [`codes`].
///
/// # Panics
///
/// Panics if the handshake fails.
pub async fn start_session(dialer: ScriptedDialer, config: LinkConfig) -> Session<ScriptedDialer> {
    Session::start(dialer, codes(), config)
        .await
        .expect("scripted session should start")
}
