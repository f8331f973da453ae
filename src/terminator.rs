//! Frame boundary detection over a growing byte buffer.
//!
//! A [`Grammar`] describes how one response is delimited. Single-pattern
//! grammars close the frame as soon as their [`Terminator`] is reached. The
//! sentence grammar layers three patterns checked in priority order:
//! transmission start, transmission end, then line end.
//!
//! Matching is pure: nothing here performs I/O or mutates the buffer. The
//! caller acts on the returned [`Boundary`].

use bytes::Bytes;

use crate::frame::BoundaryKind;

/// Terminator closing an echo packet.
pub const PACKET_END: &[u8] = b"PSTOP";
/// JPEG end-of-image marker.
pub const JPEG_END: [u8; 2] = [0xFF, 0xD9];
/// Line ending separating sentences inside a tracking transmission.
pub const LINE_END: &[u8] = b"\r\n";
/// Banner opening a tracking transmission.
pub const TRACKING_START: &[u8] = b"START ITHAKI GPS TRACKING\r\n";
/// Banner closing a tracking transmission.
pub const TRACKING_END: &[u8] = b"STOP ITHAKI GPS TRACKING\r\n";
/// End of the greeting the server sends after entering data mode.
pub const GREETING_END: &[u8] = b"\r\n\n\n";

/// Returns true iff `buffer` ends with `pattern`.
///
/// A buffer shorter than the pattern never matches.
///
/// # Examples
///
/// ```
/// use halflink::terminator::matches;
///
/// assert!(matches(b"PSTART 01 PSTOP", b"PSTOP"));
/// assert!(!matches(b"STOP", b"PSTOP"));
/// ```
#[must_use]
pub fn matches(buffer: &[u8], pattern: &[u8]) -> bool {
    buffer.len() >= pattern.len() && buffer.ends_with(pattern)
}

/// A single frame terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminator {
    /// Textual suffix such as `PSTOP`.
    Text(Bytes),
    /// Two-byte binary marker compared by value.
    ///
    /// Binary payloads may contain any text pattern as incidental data, so
    /// binary frames are only ever closed by this variant.
    BinaryMagic([u8; 2]),
}

impl Terminator {
    /// Terminator for echo packets.
    #[must_use]
    pub const fn packet_end() -> Self { Self::Text(Bytes::from_static(PACKET_END)) }

    /// Terminator for JPEG images.
    #[must_use]
    pub const fn jpeg_end() -> Self { Self::BinaryMagic(JPEG_END) }

    /// Returns true once `buffer` ends with this terminator.
    #[must_use]
    pub fn is_reached(&self, buffer: &[u8]) -> bool {
        match self {
            Self::Text(pattern) => matches(buffer, pattern),
            Self::BinaryMagic([first, second]) => {
                matches!(buffer, [.., a, b] if a == first && b == second)
            }
        }
    }

    /// Boundary kind reported when this terminator closes a frame.
    #[must_use]
    pub const fn kind(&self) -> BoundaryKind {
        match self {
            Self::Text(_) => BoundaryKind::TextEnd,
            Self::BinaryMagic(_) => BoundaryKind::BinaryMagicEnd,
        }
    }
}

/// Patterns delimiting a multi-line sentence transmission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentenceGrammar {
    /// Banner preceding the first sentence; discarded.
    pub start: Bytes,
    /// Banner closing the transmission.
    pub end: Bytes,
    /// Soft boundary after each sentence.
    pub line_end: Bytes,
}

impl Default for SentenceGrammar {
    fn default() -> Self {
        Self {
            start: Bytes::from_static(TRACKING_START),
            end: Bytes::from_static(TRACKING_END),
            line_end: Bytes::from_static(LINE_END),
        }
    }
}

/// Outcome of offering the buffer to a [`Grammar`] after one appended byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// No boundary yet; keep reading.
    Continue,
    /// The start banner completed; clear the buffer and keep reading.
    TransmissionStart,
    /// A sentence line completed; emit it, clear the buffer, keep reading.
    LineEnd,
    /// The frame is complete.
    Complete(BoundaryKind),
}

/// Termination grammar for one response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Grammar {
    /// Frame closed by a single terminator.
    Single(Terminator),
    /// Multi-line transmission with start/end banners.
    Sentences(SentenceGrammar),
}

impl Grammar {
    /// Grammar for echo packets ending in `PSTOP`.
    #[must_use]
    pub const fn packet() -> Self { Self::Single(Terminator::packet_end()) }

    /// Grammar for JPEG images.
    #[must_use]
    pub const fn image() -> Self { Self::Single(Terminator::jpeg_end()) }

    /// Grammar for GPS tracking transmissions.
    #[must_use]
    pub fn tracking() -> Self { Self::Sentences(SentenceGrammar::default()) }

    /// Grammar for the greeting received after entering data mode.
    #[must_use]
    pub const fn greeting() -> Self {
        Self::Single(Terminator::Text(Bytes::from_static(GREETING_END)))
    }

    /// Classify `buffer` after a byte has been appended.
    ///
    /// Patterns are checked by priority and at most one outcome applies.
    #[must_use]
    pub fn classify(&self, buffer: &[u8]) -> Boundary {
        match self {
            Self::Single(terminator) => {
                if terminator.is_reached(buffer) {
                    Boundary::Complete(terminator.kind())
                } else {
                    Boundary::Continue
                }
            }
            Self::Sentences(grammar) => {
                if matches(buffer, &grammar.start) {
                    Boundary::TransmissionStart
                } else if matches(buffer, &grammar.end) {
                    Boundary::Complete(BoundaryKind::TransmissionEnd)
                } else if matches(buffer, &grammar.line_end) {
                    Boundary::LineEnd
                } else {
                    Boundary::Continue
                }
            }
        }
    }
}
