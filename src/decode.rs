//! Per-kind frame decoders.
//!
//! Every payload kind shares the accumulator; only the final interpretation
//! of the [`Frame`] differs.

use bytes::Bytes;

use crate::frame::Frame;

mod coordinates;
mod nmea;
mod trace;

pub use coordinates::{AxisDms, CoordinateError, TracePoint};
pub use nmea::{Fix, ParsedSentence, Satellites, Velocity, parse_sentence};
pub use trace::{TraceOptions, select_trace_points};

/// An echo or checked echo packet as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextRecord {
    /// Packet text, terminator included. Invalid UTF-8 is replaced.
    pub text: String,
}

/// An opaque binary payload such as a JPEG image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    /// Image bytes, end marker included.
    pub bytes: Bytes,
}

/// The sentences of one tracking transmission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GpsReport {
    /// Sentences in arrival order.
    pub sentences: Vec<ParsedSentence>,
}

impl GpsReport {
    /// The `$GPGGA` fixes in arrival order.
    pub fn fixes(&self) -> impl Iterator<Item = &Fix> {
        self.sentences.iter().filter_map(|sentence| match sentence {
            ParsedSentence::Fix(fix) => Some(fix),
            _ => None,
        })
    }

    /// Trace points selected from the fixes.
    #[must_use]
    pub fn trace_points(&self, options: &TraceOptions) -> Vec<TracePoint> {
        select_trace_points(self.fixes(), options)
    }
}

/// A decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    /// Text packet.
    Text(TextRecord),
    /// Binary blob.
    Image(ImageRecord),
    /// Sentence transmission.
    Gps(GpsReport),
}

/// Decoder selected per payload kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadDecoder {
    /// Frame bytes as one line of text.
    Line,
    /// Frame bytes untouched.
    Binary,
    /// Frame lines classified as NMEA sentences.
    Sentences,
}

impl PayloadDecoder {
    /// Decode `frame`.
    #[must_use]
    pub fn decode(self, frame: Frame) -> Record {
        match self {
            Self::Line => Record::Text(TextRecord {
                text: String::from_utf8_lossy(frame.data()).into_owned(),
            }),
            Self::Binary => Record::Image(ImageRecord {
                bytes: frame.into_data(),
            }),
            Self::Sentences => Record::Gps(GpsReport {
                sentences: frame
                    .lines()
                    .iter()
                    .map(|line| parse_sentence(&String::from_utf8_lossy(line)))
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::BoundaryKind;

    #[test]
    fn sentence_decoder_reads_lines_not_banner() {
        let lines = vec![
            Bytes::from_static(b"$GPGGA,045208.000,4037.6331,N,02257.5633,E,1,07,1.5,57.8,M,36.1,M,,0000*6D\r\n"),
            Bytes::from_static(b"$GPXXX,1*00\r\n"),
        ];
        let frame = Frame::new(
            Bytes::from_static(b"STOP ITHAKI GPS TRACKING\r\n"),
            lines,
            BoundaryKind::TransmissionEnd,
        );

        let Record::Gps(report) = PayloadDecoder::Sentences.decode(frame) else {
            panic!("expected gps report");
        };
        assert_eq!(report.sentences.len(), 2);
        assert_eq!(report.fixes().count(), 1);
        assert_eq!(report.trace_points(&TraceOptions::default()).len(), 1);
    }

    #[test]
    fn binary_decoder_keeps_bytes() {
        let frame = Frame::new(
            Bytes::from_static(b"\xFF\xD8\x00\xFF\xD9"),
            Vec::new(),
            BoundaryKind::BinaryMagicEnd,
        );
        assert_eq!(
            PayloadDecoder::Binary.decode(frame),
            Record::Image(ImageRecord {
                bytes: Bytes::from_static(b"\xFF\xD8\x00\xFF\xD9")
            })
        );
    }

    #[test]
    fn line_decoder_replaces_invalid_utf8() {
        let frame = Frame::new(Bytes::from_static(b"PSTART \xFF PSTOP"), Vec::new(), BoundaryKind::TextEnd);
        let Record::Text(record) = PayloadDecoder::Line.decode(frame) else {
            panic!("expected text");
        };
        assert_eq!(record.text, "PSTART \u{FFFD} PSTOP");
    }
}
