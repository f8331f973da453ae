//! Multi-item driver loops.
//!
//! Each task issues one request per item, strictly sequentially, and hands
//! every completed item to the sink before the next request is written. The
//! loop stops at the configured item count, when the time budget is spent,
//! when the caller cancels, or at the first abandoned item. Items delivered
//! before a failure stay delivered.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    arq::{ItemRequest, RetransmissionController, RetryRecord},
    checksum::EchoLayout,
    codes::{CameraCommand, RequestCode},
    decode::{PayloadDecoder, Record, TraceOptions, TracePoint},
    error::Fault,
    session::Session,
    sink::{Delivery, PayloadKind, Sink},
    terminator::Grammar,
    transport::Dialer,
};

/// Stop conditions for a multi-item run.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Maximum number of items; `None` means unbounded.
    ///
    /// Default: `Some(1)`.
    pub limit: Option<usize>,
    /// Wall-clock budget checked between items.
    pub budget: Option<Duration>,
    /// Cancels the run between items.
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: Some(1),
            budget: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl RunOptions {
    /// Run exactly `count` items.
    #[must_use]
    pub fn count(count: usize) -> Self {
        Self {
            limit: Some(count),
            ..Self::default()
        }
    }

    /// Run until `budget` elapses.
    #[must_use]
    pub fn for_duration(budget: Duration) -> Self {
        Self {
            limit: None,
            budget: Some(budget),
            ..Self::default()
        }
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Totals for a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items delivered to the sink.
    pub completed: usize,
    /// Retransmissions across all items.
    pub retransmissions: u64,
    /// Reconnect cycles across all items.
    pub reconnects: u64,
}

impl RunSummary {
    fn record(&mut self, retry: &RetryRecord) {
        self.completed += 1;
        self.retransmissions += u64::from(retry.attempts);
        self.reconnects += u64::from(retry.reconnects);
    }
}

/// A run that ended on a terminal fault.
#[derive(Debug, Error)]
#[error("run stopped after {completed} item(s): {fault}")]
pub struct RunError {
    /// Items delivered before the fault.
    pub completed: usize,
    /// Retry bookkeeping of the abandoned item, if one was in flight.
    pub abandoned: Option<RetryRecord>,
    /// Terminal fault.
    #[source]
    pub fault: Fault,
}

enum Stop {
    Continue,
    Done,
    Cancelled,
}

fn check_stop(options: &RunOptions, started: Instant, completed: usize) -> Stop {
    if options.cancel.is_cancelled() {
        return Stop::Cancelled;
    }
    if options.limit.is_some_and(|limit| completed >= limit) {
        return Stop::Done;
    }
    if options.budget.is_some_and(|budget| started.elapsed() >= budget) {
        return Stop::Done;
    }
    Stop::Continue
}

impl<D: Dialer> Session<D> {
    /// Request plain echo packets.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] on cancellation or the first abandoned item.
    pub async fn run_echo<S>(&mut self, sink: &mut S, options: &RunOptions) -> Result<RunSummary, RunError>
    where
        S: Sink + ?Sized,
    {
        let request = ItemRequest::plain(self.codes().echo.clone(), Grammar::packet());
        self.run_items(&request, PayloadKind::Echo, PayloadDecoder::Line, sink, options)
            .await
    }

    /// Request checksummed echo packets, retransmitting corrupted ones.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] on cancellation or the first abandoned item.
    pub async fn run_checked_echo<S>(
        &mut self,
        sink: &mut S,
        options: &RunOptions,
    ) -> Result<RunSummary, RunError>
    where
        S: Sink + ?Sized,
    {
        let codes = self.codes();
        let request = ItemRequest::checked(codes.ack.clone(), codes.nack.clone(), EchoLayout::default());
        self.run_items(
            &request,
            PayloadKind::CheckedEcho,
            PayloadDecoder::Line,
            sink,
            options,
        )
        .await
    }

    /// Request JPEG images, clear or with injected corruption.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] on cancellation or the first abandoned item.
    pub async fn run_images<S>(
        &mut self,
        sink: &mut S,
        options: &RunOptions,
        corrupt: bool,
        camera: &[CameraCommand],
    ) -> Result<RunSummary, RunError>
    where
        S: Sink + ?Sized,
    {
        let request = ItemRequest::plain(self.codes().image_code(corrupt, camera), Grammar::image());
        self.run_items(&request, PayloadKind::Image, PayloadDecoder::Binary, sink, options)
            .await
    }

    /// Request one tracking transmission with `code` and return the fixes
    /// selected for a trace image.
    ///
    /// `code` is normally [`RequestCodes::gps`](crate::codes::RequestCodes)
    /// or a route derived from it.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if the transmission is abandoned.
    pub async fn run_gps<S>(
        &mut self,
        sink: &mut S,
        code: RequestCode,
        trace: &TraceOptions,
    ) -> Result<Vec<TracePoint>, RunError>
    where
        S: Sink + ?Sized,
    {
        let request = ItemRequest::plain(code, Grammar::tracking());
        let mut controller = RetransmissionController::new(self.config());
        let delivery = self
            .fetch_one(&mut controller, &request, PayloadKind::Gps, PayloadDecoder::Sentences)
            .await
            .map_err(|(fault, abandoned)| RunError {
                completed: 0,
                abandoned,
                fault,
            })?;
        let points = match &delivery.record {
            Record::Gps(report) => report.trace_points(trace),
            Record::Text(_) | Record::Image(_) => Vec::new(),
        };
        sink.deliver(delivery);
        Ok(points)
    }

    /// Request the map image marking `points`.
    ///
    /// Does nothing when `points` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if the image is abandoned.
    pub async fn run_gps_trace<S>(&mut self, sink: &mut S, points: &[TracePoint]) -> Result<RunSummary, RunError>
    where
        S: Sink + ?Sized,
    {
        if points.is_empty() {
            tracing::warn!("no trace points; skipping trace image");
            return Ok(RunSummary::default());
        }
        let request = ItemRequest::plain(self.codes().gps_trace(points), Grammar::image());
        self.run_items(
            &request,
            PayloadKind::GpsTrace,
            PayloadDecoder::Binary,
            sink,
            &RunOptions::count(1),
        )
        .await
    }

    async fn run_items<S>(
        &mut self,
        request: &ItemRequest,
        kind: PayloadKind,
        decoder: PayloadDecoder,
        sink: &mut S,
        options: &RunOptions,
    ) -> Result<RunSummary, RunError>
    where
        S: Sink + ?Sized,
    {
        let started = Instant::now();
        let mut controller = RetransmissionController::new(self.config());
        let mut summary = RunSummary::default();

        loop {
            match check_stop(options, started, summary.completed) {
                Stop::Continue => {}
                Stop::Done => break,
                Stop::Cancelled => {
                    tracing::info!(kind = kind.as_str(), completed = summary.completed, "run cancelled");
                    return Err(RunError {
                        completed: summary.completed,
                        abandoned: None,
                        fault: Fault::Cancelled,
                    });
                }
            }

            match self.fetch_one(&mut controller, request, kind, decoder).await {
                Ok(delivery) => {
                    summary.record(&delivery.retry);
                    sink.deliver(delivery);
                }
                Err((fault, abandoned)) => {
                    return Err(RunError {
                        completed: summary.completed,
                        abandoned,
                        fault,
                    });
                }
            }
        }

        tracing::info!(
            kind = kind.as_str(),
            completed = summary.completed,
            retransmissions = summary.retransmissions,
            reconnects = summary.reconnects,
            "run finished"
        );
        Ok(summary)
    }

    async fn fetch_one(
        &mut self,
        controller: &mut RetransmissionController,
        request: &ItemRequest,
        kind: PayloadKind,
        decoder: PayloadDecoder,
    ) -> Result<Delivery, (Fault, Option<RetryRecord>)> {
        match controller.fetch(self, request).await {
            Ok(exchange) => Ok(Delivery {
                kind,
                record: decoder.decode(exchange.frame),
                retry: exchange.retry,
            }),
            Err(failure) => Err((failure.fault, Some(failure.retry))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_wins_over_other_stops() {
        let options = RunOptions::count(0);
        options.cancel.cancel();
        assert!(matches!(check_stop(&options, Instant::now(), 0), Stop::Cancelled));
    }

    #[test]
    fn limit_stops_run() {
        let options = RunOptions::count(2);
        assert!(matches!(check_stop(&options, Instant::now(), 1), Stop::Continue));
        assert!(matches!(check_stop(&options, Instant::now(), 2), Stop::Done));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_stops_run() {
        let options = RunOptions::for_duration(Duration::from_secs(5));
        let started = Instant::now();
        assert!(matches!(check_stop(&options, started, 0), Stop::Continue));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(matches!(check_stop(&options, started, 100), Stop::Done));
    }

    #[test]
    fn summary_accumulates_retries() {
        let mut summary = RunSummary::default();
        summary.record(&RetryRecord {
            attempts: 2,
            reconnects: 1,
            response_time_ms: 10,
            succeeded: true,
        });
        summary.record(&RetryRecord::default());
        assert_eq!(
            summary,
            RunSummary {
                completed: 2,
                retransmissions: 2,
                reconnects: 1
            }
        );
    }
}
