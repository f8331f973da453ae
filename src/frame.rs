//! Accumulated response frames.

use bytes::Bytes;

/// The boundary that closed a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryKind {
    /// A textual suffix such as `PSTOP`.
    TextEnd,
    /// The end banner of a multi-line transmission.
    TransmissionEnd,
    /// A two-byte binary marker.
    BinaryMagicEnd,
}

impl BoundaryKind {
    /// Returns the boundary name as a static string for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextEnd => "text-end",
            Self::TransmissionEnd => "transmission-end",
            Self::BinaryMagicEnd => "binary-magic-end",
        }
    }
}

/// One complete response.
///
/// `data` holds the bytes accumulated since the last boundary, terminator
/// included. Multi-line transmissions additionally carry each sentence line
/// that was split off at a soft boundary, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
    lines: Vec<Bytes>,
    boundary: BoundaryKind,
}

impl Frame {
    /// Build a frame from its parts.
    #[must_use]
    pub fn new(data: Bytes, lines: Vec<Bytes>, boundary: BoundaryKind) -> Self {
        Self {
            data,
            lines,
            boundary,
        }
    }

    /// Bytes closing the frame (the whole frame for single-terminator grammars).
    #[must_use]
    pub fn data(&self) -> &[u8] { &self.data }

    /// Sentence lines split off before the final boundary.
    #[must_use]
    pub fn lines(&self) -> &[Bytes] { &self.lines }

    /// Boundary that closed the frame.
    #[must_use]
    pub fn boundary(&self) -> BoundaryKind { self.boundary }

    /// Total bytes received for this frame.
    #[must_use]
    pub fn len(&self) -> usize { self.data.len() + self.lines.iter().map(Bytes::len).sum::<usize>() }

    /// Returns true when no bytes were received.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Consume the frame, returning its closing bytes.
    #[must_use]
    pub fn into_data(self) -> Bytes { self.data }

    /// Consume the frame, returning its sentence lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<Bytes> { self.lines }
}
