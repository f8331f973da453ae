//! Latency measurement and run stop conditions, driven by tokio's paused
//! clock.

use std::time::Duration;

use bytes::Bytes;
use halflink::{
    LinkConfig,
    RunOptions,
    error::Fault,
    sink::{Delivery, MemorySink},
};
use halflink_testing::{
    Journal,
    Reply,
    ScriptedDialer,
    ScriptedTransport,
    checked_packet,
    corrupt_packet,
    echo_packet,
    journal,
    start_session,
};
use rstest::rstest;
use tokio_util::sync::CancellationToken;

const PAYLOAD: &[u8; 16] = b"0123456789ABCDEF";

fn delayed(delay_ms: u64, frame: Bytes) -> Reply {
    Reply::new().delay(Duration::from_millis(delay_ms)).bytes(frame)
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn response_time_covers_the_final_attempt_only(journal: Journal) {
    let link = ScriptedTransport::new(&journal).replies([
        delayed(900, corrupt_packet(PAYLOAD)),
        delayed(450, corrupt_packet(PAYLOAD)),
        delayed(120, checked_packet(PAYLOAD)),
    ]);
    let mut session = start_session(ScriptedDialer::new(&journal).link(link), LinkConfig::default()).await;
    let mut sink = MemorySink::new();

    session
        .run_checked_echo(&mut sink, &RunOptions::default())
        .await
        .expect("item should be delivered");

    assert_eq!(sink.len(), 1);
    let retry = sink.deliveries()[0].retry;
    assert_eq!(retry.attempts, 2);
    assert!(retry.succeeded);
    assert_eq!(retry.response_time_ms, 120);
    assert_eq!(journal.writes(), ["Q0005", "R0006", "R0006"]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn latency_includes_delays_inside_the_frame(journal: Journal) {
    let reply = Reply::new()
        .delay(Duration::from_millis(40))
        .bytes(&b"PSTART 17-03-2024 "[..])
        .delay(Duration::from_millis(35))
        .bytes(&b"12-00-01 01 PSTOP"[..]);
    let link = ScriptedTransport::new(&journal).reply(reply);
    let mut session = start_session(ScriptedDialer::new(&journal).link(link), LinkConfig::default()).await;
    let mut sink = MemorySink::new();

    session
        .run_echo(&mut sink, &RunOptions::default())
        .await
        .expect("item should be delivered");

    assert_eq!(sink.deliveries()[0].retry.response_time_ms, 75);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn time_budget_is_checked_between_items(journal: Journal) {
    let link = ScriptedTransport::new(&journal).replies((1..=10).map(|seq| delayed(400, echo_packet(seq))));
    let mut session = start_session(ScriptedDialer::new(&journal).link(link), LinkConfig::default()).await;
    let mut sink = MemorySink::new();

    let summary = session
        .run_echo(&mut sink, &RunOptions::for_duration(Duration::from_secs(1)))
        .await
        .expect("budget should end the run cleanly");

    assert_eq!(summary.completed, 3);
    assert_eq!(journal.writes().len(), 3);
}

#[rstest]
#[tokio::test]
async fn cancellation_stops_before_the_next_request(journal: Journal) {
    let link = ScriptedTransport::new(&journal).replies((1..=5).map(|seq| Reply::frame(echo_packet(seq))));
    let mut session = start_session(ScriptedDialer::new(&journal).link(link), LinkConfig::default()).await;
    let token = CancellationToken::new();
    let trigger = token.clone();
    let mut received = Vec::new();
    let mut sink = |delivery: Delivery| {
        received.push(delivery);
        trigger.cancel();
    };

    let err = session
        .run_echo(&mut sink, &RunOptions::count(5).cancel(token))
        .await
        .expect_err("run should be cancelled");

    assert!(matches!(err.fault, Fault::Cancelled));
    assert_eq!(err.completed, 1);
    assert!(err.abandoned.is_none());
    assert_eq!(received.len(), 1);
    assert_eq!(journal.writes(), ["E0001"]);
}
