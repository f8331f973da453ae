//! TCP implementation of the transport collaborator.

use std::{io, net::SocketAddr, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::timeout,
};

use super::{Dialer, ReadSignal, Transport};
use crate::config::LinkParams;

/// Dials TCP connections to a fixed address.
///
/// # Examples
///
/// ```no_run
/// use halflink::{config::LinkParams, transport::{Dialer, TcpDialer}};
///
/// # #[tokio::main]
/// # async fn main() -> std::io::Result<()> {
/// let dialer = TcpDialer::new("127.0.0.1:7000".parse().expect("valid socket address"));
/// let _transport = dialer.dial(&LinkParams::initial()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TcpDialer {
    addr: SocketAddr,
}

impl TcpDialer {
    /// Create a dialer for `addr`.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self { Self { addr } }

    /// Address this dialer connects to.
    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.addr }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Transport = TcpTransport;

    async fn dial(&self, params: &LinkParams) -> io::Result<TcpTransport> {
        tracing::debug!(peer.addr = %self.addr, speed = params.speed, "dialling");
        let stream = timeout(params.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        stream.set_nodelay(true)?;
        Ok(TcpTransport::new(stream, params.timeout))
    }
}

/// Transport over a connected TCP stream.
///
/// Each byte read waits at most `read_timeout` before reporting
/// [`ReadSignal::Timeout`].
#[derive(Debug)]
pub struct TcpTransport {
    stream: BufReader<TcpStream>,
    read_timeout: Duration,
}

impl TcpTransport {
    /// Wrap a connected stream.
    #[must_use]
    pub fn new(stream: TcpStream, read_timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            read_timeout,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&mut self, mode: &str) -> bool {
        let mut line = Vec::with_capacity(mode.len() + 1);
        line.extend_from_slice(mode.as_bytes());
        line.push(b'\r');
        self.write(&line).await
    }

    async fn write(&mut self, bytes: &[u8]) -> bool {
        let stream = self.stream.get_mut();
        match stream.write_all(bytes).await {
            Ok(()) => stream.flush().await.is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "transport write failed");
                false
            }
        }
    }

    async fn read_byte(&mut self) -> ReadSignal {
        match timeout(self.read_timeout, self.stream.read_u8()).await {
            Ok(Ok(byte)) => ReadSignal::Byte(byte),
            Ok(Err(e)) => ReadSignal::Error(e),
            Err(_) => ReadSignal::Timeout,
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.get_mut().shutdown().await {
            tracing::debug!(error = %e, "transport shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{io::AsyncWriteExt, net::TcpListener};

    use super::*;

    #[tokio::test]
    async fn reads_bytes_and_reports_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener.local_addr");

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut mode = [0_u8; 7];
            stream.read_exact(&mut mode).await.expect("read mode line");
            assert_eq!(&mode, b"ITHAKI\r");
            stream.write_all(b"OK").await.expect("write reply");
            stream
        });

        let params = LinkParams {
            speed: 0,
            timeout: Duration::from_millis(50),
        };
        let mut transport = TcpDialer::new(addr).dial(&params).await.expect("dial");
        assert!(transport.open("ITHAKI").await);
        assert!(matches!(transport.read_byte().await, ReadSignal::Byte(b'O')));
        assert!(matches!(transport.read_byte().await, ReadSignal::Byte(b'K')));

        let _stream = server.await.expect("join server");
        assert!(matches!(transport.read_byte().await, ReadSignal::Timeout));
        transport.close().await;
    }
}
