//! XOR8 payload validation.
//!
//! Checked echo packets have the shape
//!
//! ```text
//! PSTART DD-MM-YYYY HH-MM-SS PC <XXXXXXXXXXXXXXXX> FCS PSTOP
//! ```
//!
//! where `FCS` is the decimal XOR of the sixteen payload characters between
//! the angle brackets.

use crate::{
    error::{Fault, MalformedFrame},
    frame::Frame,
};

/// Width of the checked echo payload.
pub const ECHO_PAYLOAD_LEN: usize = 16;

/// Distance from the end of the payload to the checksum field (`> `).
const CHECKSUM_GAP: usize = 2;

/// Outcome of checking one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChecksumResult {
    /// XOR computed over the payload.
    pub computed: u8,
    /// Checksum declared by the frame, saturated at `u32::MAX`.
    ///
    /// Values above 255 can never match and are reported as a mismatch.
    pub declared: u32,
    /// True iff `computed == declared`.
    pub ok: bool,
}

impl ChecksumResult {
    /// Convert a mismatch into [`Fault::ChecksumMismatch`].
    ///
    /// # Errors
    ///
    /// Returns [`Fault::ChecksumMismatch`] when `ok` is false.
    pub fn check(self) -> Result<Self, Fault> {
        if self.ok {
            Ok(self)
        } else {
            Err(Fault::ChecksumMismatch {
                computed: self.computed,
                declared: self.declared,
            })
        }
    }
}

/// Running 8-bit exclusive-or over `bytes`.
///
/// # Examples
///
/// ```
/// use halflink::checksum::xor8;
///
/// assert_eq!(xor8(b""), 0);
/// assert_eq!(xor8(&[0x0F, 0xF0]), 0xFF);
/// ```
#[must_use]
pub fn xor8(bytes: &[u8]) -> u8 { bytes.iter().fold(0, |acc, byte| acc ^ byte) }

/// Validate the XOR8 checksum of a payload region.
///
/// The checksum field is the run of ASCII digits starting at
/// `checksum_offset`.
///
/// # Errors
///
/// Returns [`MalformedFrame`] if the payload region runs past the end of
/// `frame` or the checksum field is missing or not decimal. A decimal value
/// that does not fit in a byte is a mismatch, not a malformed frame.
pub fn validate(
    frame: &[u8],
    payload_offset: usize,
    payload_length: usize,
    checksum_offset: usize,
) -> Result<ChecksumResult, MalformedFrame> {
    let payload = payload_offset
        .checked_add(payload_length)
        .and_then(|end| frame.get(payload_offset..end))
        .ok_or(MalformedFrame::PayloadTooShort {
            have: frame.len().saturating_sub(payload_offset),
            need: payload_length,
        })?;
    let declared = parse_declared(frame.get(checksum_offset..).unwrap_or_default())?;
    let computed = xor8(payload);
    Ok(ChecksumResult {
        computed,
        declared,
        ok: u32::from(computed) == declared,
    })
}

fn parse_declared(field: &[u8]) -> Result<u32, MalformedFrame> {
    let digits = field.iter().take_while(|byte| byte.is_ascii_digit());
    let mut value: u32 = 0;
    let mut seen = false;
    for digit in digits {
        seen = true;
        value = value
            .saturating_mul(10)
            .saturating_add(u32::from(digit - b'0'));
    }
    if !seen {
        return Err(MalformedFrame::InvalidChecksumField);
    }
    Ok(value)
}

/// Locates the payload and checksum fields inside a checked echo packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EchoLayout {
    payload_length: usize,
}

impl Default for EchoLayout {
    fn default() -> Self {
        Self {
            payload_length: ECHO_PAYLOAD_LEN,
        }
    }
}

impl EchoLayout {
    /// Layout with a custom payload width.
    #[must_use]
    pub fn with_payload_length(payload_length: usize) -> Self { Self { payload_length } }

    /// Validate a checked echo frame.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedFrame::MissingPayloadMarker`] when the frame has
    /// no `<`, or any error reported by [`validate`].
    pub fn validate(&self, frame: &Frame) -> Result<ChecksumResult, MalformedFrame> {
        let data = frame.data();
        let marker = data
            .iter()
            .position(|&byte| byte == b'<')
            .ok_or(MalformedFrame::MissingPayloadMarker)?;
        let payload_offset = marker + 1;
        validate(
            data,
            payload_offset,
            self.payload_length,
            payload_offset + self.payload_length + CHECKSUM_GAP,
        )
    }
}
