//! Byte-at-a-time frame accumulation.
//!
//! [`FrameAccumulator`] owns the only receive buffer in the engine. The
//! buffer is cleared at the start of every [`accumulate`] call and whenever a
//! transport fault discards a partial frame, so no bytes survive from one
//! request into the next.
//!
//! [`accumulate`]: FrameAccumulator::accumulate

use std::mem;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    config::clamp_frame_length,
    error::{DropCause, Fault, MalformedFrame},
    frame::Frame,
    terminator::{Boundary, Grammar},
    transport::{ReadSignal, Transport},
};

const INITIAL_CAPACITY: usize = 256;

/// Accumulates bytes from a [`Transport`] until a [`Grammar`] boundary.
#[derive(Debug)]
pub struct FrameAccumulator {
    buffer: BytesMut,
    lines: Vec<Bytes>,
    received: usize,
    max_frame_length: usize,
}

impl FrameAccumulator {
    /// Create an accumulator that rejects frames above `max_frame_length`.
    ///
    /// The limit is clamped to the crate-wide frame length bounds.
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            lines: Vec::new(),
            received: 0,
            max_frame_length: clamp_frame_length(max_frame_length),
        }
    }

    /// Bytes currently held for the in-flight frame.
    #[must_use]
    pub fn buffered(&self) -> usize { self.received }

    /// Read bytes until `grammar` reports a complete frame.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::TransportDrop`] on a read timeout or transport error
    /// and [`Fault::MalformedFrame`] when the frame outgrows the configured
    /// limit. In both cases the partial frame is discarded.
    pub async fn accumulate<T>(&mut self, transport: &mut T, grammar: &Grammar) -> Result<Frame, Fault>
    where
        T: Transport + ?Sized,
    {
        self.reset();
        loop {
            let byte = match transport.read_byte().await {
                ReadSignal::Byte(byte) => byte,
                ReadSignal::Timeout => return Err(self.discard(DropCause::Timeout)),
                ReadSignal::Error(e) => return Err(self.discard(DropCause::Io(e))),
            };

            self.buffer.put_u8(byte);
            self.received += 1;
            if self.received > self.max_frame_length {
                let size = self.received;
                self.reset();
                return Err(MalformedFrame::Oversized {
                    size,
                    max: self.max_frame_length,
                }
                .into());
            }

            match grammar.classify(&self.buffer) {
                Boundary::Continue => {}
                Boundary::TransmissionStart => {
                    self.received -= self.buffer.len();
                    self.buffer.clear();
                }
                Boundary::LineEnd => self.lines.push(self.buffer.split().freeze()),
                Boundary::Complete(kind) => {
                    let data = self.buffer.split().freeze();
                    let lines = mem::take(&mut self.lines);
                    self.received = 0;
                    tracing::trace!(boundary = kind.as_str(), lines = lines.len(), "frame complete");
                    return Ok(Frame::new(data, lines, kind));
                }
            }
        }
    }

    fn discard(&mut self, cause: DropCause) -> Fault {
        let bytes_discarded = self.received;
        self.reset();
        tracing::debug!(bytes_discarded, %cause, "discarding partial frame");
        Fault::TransportDrop {
            bytes_discarded,
            cause,
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.lines.clear();
        self.received = 0;
    }
}
