//! Link sessions.
//!
//! A [`Session`] owns the live transport, the dialer that produced it, the
//! request codes and the link configuration. The transport is only ever
//! replaced through [`Session::reconnect`], which closes the old handle
//! before installing the new one.

use crate::{
    accumulator::FrameAccumulator,
    codes::RequestCodes,
    config::{LinkConfig, LinkParams},
    error::{ConnectError, Fault},
    reconnect::ReconnectPolicy,
    terminator::Grammar,
    transport::{Dialer, Transport},
};

/// Parameters of the data-mode handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Handshake {
    mode: String,
    max_frame_length: usize,
}

impl Handshake {
    /// Handshake entering `mode` and accepting greetings up to
    /// `max_frame_length` bytes.
    #[must_use]
    pub fn new(mode: impl Into<String>, max_frame_length: usize) -> Self {
        Self {
            mode: mode.into(),
            max_frame_length,
        }
    }

    /// Mode string passed to [`Transport::open`].
    #[must_use]
    pub fn mode(&self) -> &str { &self.mode }
}

impl From<&LinkConfig> for Handshake {
    fn from(config: &LinkConfig) -> Self { Self::new(config.mode.clone(), config.max_frame_length) }
}

/// Dial a transport, enter data mode and consume the server greeting.
///
/// A transport that fails after dialling is closed before the error is
/// returned.
///
/// # Errors
///
/// Returns [`ConnectError`] describing the step that failed.
pub async fn establish<D>(
    dialer: &D,
    params: &LinkParams,
    handshake: &Handshake,
) -> Result<D::Transport, ConnectError>
where
    D: Dialer + ?Sized,
{
    let mut transport = dialer.dial(params).await.map_err(ConnectError::Dial)?;
    if !transport.open(&handshake.mode).await {
        transport.close().await;
        return Err(ConnectError::OpenRejected {
            mode: handshake.mode.clone(),
        });
    }

    let mut accumulator = FrameAccumulator::new(handshake.max_frame_length);
    match accumulator.accumulate(&mut transport, &Grammar::greeting()).await {
        Ok(greeting) => {
            tracing::debug!(mode = %handshake.mode, bytes = greeting.len(), "greeting received");
            Ok(transport)
        }
        Err(fault) => {
            transport.close().await;
            Err(greeting_error(fault))
        }
    }
}

fn greeting_error(fault: Fault) -> ConnectError {
    match fault {
        Fault::TransportDrop { cause, .. } => ConnectError::Greeting(cause),
        Fault::MalformedFrame(malformed) => ConnectError::MalformedGreeting(malformed),
        other => ConnectError::GreetingFault(Box::new(other)),
    }
}

/// A connected link and everything needed to re-establish it.
pub struct Session<D: Dialer> {
    dialer: D,
    codes: RequestCodes,
    config: LinkConfig,
    handshake: Handshake,
    reconnect: ReconnectPolicy,
    transport: Option<D::Transport>,
}

impl<D: Dialer> Session<D> {
    /// Connect with the initial link parameters and complete the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::ConnectFailure`] if the link cannot be brought into
    /// data mode.
    pub async fn start(dialer: D, codes: RequestCodes, config: LinkConfig) -> Result<Self, Fault> {
        let handshake = Handshake::from(&config);
        let transport = establish(&dialer, &config.initial, &handshake)
            .await
            .map_err(Fault::ConnectFailure)?;
        tracing::info!(mode = %config.mode, speed = config.initial.speed, "session established");
        Ok(Self {
            reconnect: ReconnectPolicy::new(config.reconnect),
            dialer,
            codes,
            config,
            handshake,
            transport: Some(transport),
        })
    }

    /// Request codes issued for this session.
    #[must_use]
    pub fn codes(&self) -> &RequestCodes { &self.codes }

    /// Link configuration.
    #[must_use]
    pub fn config(&self) -> &LinkConfig { &self.config }

    /// Returns true while the session holds a transport.
    #[must_use]
    pub fn is_connected(&self) -> bool { self.transport.is_some() }

    pub(crate) fn transport_mut(&mut self) -> Result<&mut D::Transport, Fault> {
        self.transport
            .as_mut()
            .ok_or(Fault::ConnectFailure(ConnectError::Closed))
    }

    /// Replace the transport using the reconnect policy.
    ///
    /// On failure the session is left without a transport.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::ReconnectFailure`] when every attempt fails.
    pub async fn reconnect(&mut self) -> Result<(), Fault> {
        let old = self.transport.take();
        let transport = self.reconnect.recover(&self.dialer, &self.handshake, old).await?;
        self.transport = Some(transport);
        Ok(())
    }

    /// Close the transport. Further requests fail with
    /// [`ConnectError::Closed`].
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
            tracing::info!("session closed");
        }
    }
}

impl<D: Dialer> std::fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("codes", &self.codes)
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::{
        codes::RequestCode,
        error::{DropCause, MalformedFrame},
        transport::{MockDialer, MockTransport, ReadSignal},
    };

    fn codes() -> RequestCodes {
        let code = |text: &str| RequestCode::new(text).expect("valid test code");
        RequestCodes {
            echo: code("E0001"),
            image: code("M0002"),
            image_corrupt: code("G0003"),
            gps: code("P0004"),
            ack: code("Q0005"),
            nack: code("R0006"),
        }
    }

    fn replying(reply: &'static [u8]) -> MockTransport {
        let mut bytes = reply.iter().copied();
        let mut transport = MockTransport::new();
        transport.expect_open().returning(|mode| mode == "ITHAKI");
        transport
            .expect_read_byte()
            .returning(move || bytes.next().map_or(ReadSignal::Timeout, ReadSignal::Byte));
        transport
    }

    #[tokio::test]
    async fn start_consumes_greeting() {
        let mut dialer = MockDialer::new();
        dialer.expect_dial().times(1).returning(|params| {
            assert_eq!(params.speed, 76_000);
            Ok(replying(b"Welcome to ITHAKI\r\n\n\n"))
        });

        let session = Session::start(dialer, codes(), LinkConfig::default())
            .await
            .expect("session starts");
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn rejected_mode_closes_transport() {
        let mut dialer = MockDialer::new();
        dialer.expect_dial().returning(|_| {
            let mut transport = MockTransport::new();
            transport.expect_open().returning(|_| false);
            transport.expect_close().times(1).returning(|| ());
            Ok(transport)
        });

        let fault = Session::start(dialer, codes(), LinkConfig::default())
            .await
            .expect_err("mode rejected");
        assert!(matches!(
            fault,
            Fault::ConnectFailure(ConnectError::OpenRejected { .. })
        ));
    }

    #[tokio::test]
    async fn silent_greeting_is_a_handshake_failure() {
        let mut dialer = MockDialer::new();
        dialer.expect_dial().returning(|_| {
            let mut transport = replying(b"Welcome");
            transport.expect_close().times(1).returning(|| ());
            Ok(transport)
        });

        let fault = Session::start(dialer, codes(), LinkConfig::default())
            .await
            .expect_err("greeting times out");
        assert!(matches!(
            fault,
            Fault::ConnectFailure(ConnectError::Greeting(DropCause::Timeout))
        ));
    }

    #[test]
    fn greeting_faults_keep_their_cause() {
        assert!(matches!(
            greeting_error(Fault::TransportDrop {
                bytes_discarded: 3,
                cause: DropCause::Timeout,
            }),
            ConnectError::Greeting(DropCause::Timeout)
        ));
        assert!(matches!(
            greeting_error(Fault::MalformedFrame(MalformedFrame::MissingPayloadMarker)),
            ConnectError::MalformedGreeting(MalformedFrame::MissingPayloadMarker)
        ));
        let ConnectError::GreetingFault(inner) = greeting_error(Fault::Cancelled) else {
            panic!("other faults should be carried unchanged");
        };
        assert!(matches!(*inner, Fault::Cancelled));
    }

    #[tokio::test]
    async fn dial_error_is_connect_failure() {
        let mut dialer = MockDialer::new();
        dialer
            .expect_dial()
            .returning(|_| Err(io::Error::from(io::ErrorKind::ConnectionRefused)));

        let fault = Session::start(dialer, codes(), LinkConfig::default())
            .await
            .expect_err("dial refused");
        assert!(matches!(fault, Fault::ConnectFailure(ConnectError::Dial(_))));
    }

    #[tokio::test]
    async fn closed_session_has_no_transport() {
        let mut dialer = MockDialer::new();
        dialer.expect_dial().returning(|_| {
            let mut transport = replying(b"\r\n\n\n");
            transport.expect_close().times(1).returning(|| ());
            Ok(transport)
        });

        let mut session = Session::start(dialer, codes(), LinkConfig::default())
            .await
            .expect("session starts");
        session.close().await;
        assert!(!session.is_connected());
        assert!(matches!(
            session.transport_mut(),
            Err(Fault::ConnectFailure(ConnectError::Closed))
        ));
    }
}
