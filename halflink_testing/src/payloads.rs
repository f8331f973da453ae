//! Builders for realistic link responses.

use bytes::{BufMut, Bytes, BytesMut};
use halflink::checksum::xor8;

/// A plain echo packet numbered `seq`.
#[must_use]
pub fn echo_packet(seq: u32) -> Bytes {
    Bytes::from(format!("PSTART 17-03-2024 12-00-{:02} {seq:02} PSTOP", seq % 60))
}

/// A checked echo packet carrying `payload` and its correct checksum.
///
/// # Panics
///
/// Panics if `payload` is not sixteen bytes long.
#[must_use]
pub fn checked_packet(payload: &[u8]) -> Bytes { checked_with(payload, xor8(payload)) }

/// A checked echo packet whose declared checksum is off by one bit.
///
/// # Panics
///
/// Panics if `payload` is not sixteen bytes long.
#[must_use]
pub fn corrupt_packet(payload: &[u8]) -> Bytes { checked_with(payload, xor8(payload) ^ 0x01) }

fn checked_with(payload: &[u8], declared: u8) -> Bytes {
    assert_eq!(payload.len(), 16, "checked payloads are sixteen bytes");
    let mut wire = BytesMut::from(&b"PSTART 17-03-2024 12-00-01 42 <"[..]);
    wire.put_slice(payload);
    wire.put_slice(format!("> {declared:03} PSTOP").as_bytes());
    wire.freeze()
}

/// A minimal JPEG stream wrapping `body`.
#[must_use]
pub fn jpeg(body: &[u8]) -> Bytes {
    let mut wire = BytesMut::with_capacity(body.len() + 4);
    wire.put_slice(&[0xFF, 0xD8]);
    wire.put_slice(body);
    wire.put_slice(&[0xFF, 0xD9]);
    wire.freeze()
}

/// A `$GPGGA` sentence timestamped `hhmmss`, without line ending.
#[must_use]
pub fn gga_sentence(time: &str) -> String {
    format!("$GPGGA,{time}.000,4037.6331,N,02257.5633,E,1,07,1.5,57.8,M,36.1,M,,0000*6D")
}

/// A complete tracking transmission carrying `lines`.
#[must_use]
pub fn tracking_transmission<I, S>(lines: I) -> Bytes
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut wire = BytesMut::from(&b"START ITHAKI GPS TRACKING\r\n"[..]);
    for line in lines {
        wire.put_slice(line.as_ref().as_bytes());
        wire.put_slice(b"\r\n");
    }
    wire.put_slice(b"STOP ITHAKI GPS TRACKING\r\n");
    wire.freeze()
}
