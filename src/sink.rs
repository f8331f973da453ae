//! Destinations for decoded items.
//!
//! The engine hands each completed item to a [`Sink`] exactly once.
//! Persistence and file naming belong to the sink implementation.

use std::fmt;

use log::info;

use crate::{arq::RetryRecord, decode::Record};

/// Kind of item delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// Plain echo packet.
    Echo,
    /// Checksummed echo packet.
    CheckedEcho,
    /// JPEG image.
    Image,
    /// Tracking transmission.
    Gps,
    /// JPEG map marking trace points.
    GpsTrace,
}

impl PayloadKind {
    /// Returns the kind as a static string for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::CheckedEcho => "checked-echo",
            Self::Image => "image",
            Self::Gps => "gps",
            Self::GpsTrace => "gps-trace",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One completed item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Kind of item.
    pub kind: PayloadKind,
    /// Decoded payload.
    pub record: Record,
    /// Retry bookkeeping for the item.
    pub retry: RetryRecord,
}

/// Receives completed items.
pub trait Sink: Send {
    /// Take ownership of a delivery.
    fn deliver(&mut self, delivery: Delivery);
}

impl<F> Sink for F
where
    F: FnMut(Delivery) + Send,
{
    fn deliver(&mut self, delivery: Delivery) { self(delivery) }
}

/// Collects deliveries in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    deliveries: Vec<Delivery>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Deliveries received so far.
    #[must_use]
    pub fn deliveries(&self) -> &[Delivery] { &self.deliveries }

    /// Number of deliveries received.
    #[must_use]
    pub fn len(&self) -> usize { self.deliveries.len() }

    /// Returns true if nothing was delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.deliveries.is_empty() }

    /// Consume the sink, returning its deliveries.
    #[must_use]
    pub fn into_deliveries(self) -> Vec<Delivery> { self.deliveries }
}

impl Sink for MemorySink {
    fn deliver(&mut self, delivery: Delivery) { self.deliveries.push(delivery); }
}

/// Logs a one-line summary of each delivery.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn deliver(&mut self, delivery: Delivery) {
        let Delivery { kind, record, retry } = delivery;
        let summary = match &record {
            Record::Text(text) => text.text.trim_end().to_owned(),
            Record::Image(image) => format!("{} bytes", image.bytes.len()),
            Record::Gps(report) => format!("{} sentences", report.sentences.len()),
        };
        info!(
            "{kind}: {summary} (attempts={}, reconnects={}, response_time_ms={})",
            retry.attempts, retry.reconnects, retry.response_time_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::decode::ImageRecord;

    fn delivery(kind: PayloadKind) -> Delivery {
        Delivery {
            kind,
            record: Record::Image(ImageRecord {
                bytes: Bytes::from_static(b"\xFF\xD9"),
            }),
            retry: RetryRecord::default(),
        }
    }

    #[test]
    fn memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.deliver(delivery(PayloadKind::Image));
        sink.deliver(delivery(PayloadKind::GpsTrace));

        let kinds: Vec<PayloadKind> = sink.deliveries().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, [PayloadKind::Image, PayloadKind::GpsTrace]);
    }

    #[test]
    fn closures_are_sinks() {
        let mut count = 0;
        let mut sink = |_: Delivery| count += 1;
        sink.deliver(delivery(PayloadKind::Echo));
        sink.deliver(delivery(PayloadKind::Echo));
        assert_eq!(count, 2);
    }
}
