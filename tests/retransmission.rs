//! Checked echo runs against scripted links that corrupt, mangle or refuse
//! responses.

use halflink::{
    LinkConfig,
    RunOptions,
    config::RetryConfig,
    decode::Record,
    error::{Fault, MalformedFrame},
    sink::MemorySink,
};
use halflink_testing::{
    Journal,
    Reply,
    ScriptedDialer,
    ScriptedTransport,
    checked_packet,
    corrupt_packet,
    journal,
    start_session,
};
use rstest::rstest;

const PAYLOAD: &[u8; 16] = b"0123456789ABCDEF";

fn link(journal: &Journal, replies: impl IntoIterator<Item = Reply>) -> ScriptedDialer {
    ScriptedDialer::new(journal).link(ScriptedTransport::new(journal).replies(replies))
}

fn corrupted(count: u32) -> impl Iterator<Item = Reply> {
    (0..count).map(|_| Reply::frame(corrupt_packet(PAYLOAD)))
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(4)]
#[tokio::test]
async fn each_corruption_costs_one_nack(journal: Journal, #[case] corruptions: u32) {
    let replies = corrupted(corruptions).chain([Reply::frame(checked_packet(PAYLOAD))]);
    let mut session = start_session(link(&journal, replies), LinkConfig::default()).await;
    let mut sink = MemorySink::new();

    let summary = session
        .run_checked_echo(&mut sink, &RunOptions::default())
        .await
        .expect("item should be delivered");

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.retransmissions, u64::from(corruptions));
    let retry = sink.deliveries()[0].retry;
    assert_eq!(retry.attempts, corruptions);
    assert!(retry.succeeded);

    let mut expected = vec!["Q0005".to_owned()];
    expected.extend((0..corruptions).map(|_| "R0006".to_owned()));
    assert_eq!(journal.writes(), expected);
}

#[rstest]
#[tokio::test]
async fn next_item_starts_with_ack(journal: Journal) {
    let replies = corrupted(1).chain([
        Reply::frame(checked_packet(PAYLOAD)),
        Reply::frame(checked_packet(b"FEDCBA9876543210")),
    ]);
    let mut session = start_session(link(&journal, replies), LinkConfig::default()).await;
    let mut sink = MemorySink::new();

    session
        .run_checked_echo(&mut sink, &RunOptions::count(2))
        .await
        .expect("both items should be delivered");

    assert_eq!(journal.writes(), ["Q0005", "R0006", "Q0005"]);
    let attempts: Vec<u32> = sink.deliveries().iter().map(|d| d.retry.attempts).collect();
    assert_eq!(attempts, [1, 0]);
    let Record::Text(last) = &sink.deliveries()[1].record else {
        panic!("checked echo should decode as text");
    };
    assert!(last.text.contains("<FEDCBA9876543210>"));
}

#[rstest]
#[tokio::test]
async fn retry_cap_abandons_the_item(journal: Journal) {
    let config = LinkConfig::default().retry(RetryConfig::default().max_retransmissions(2));
    let mut session = start_session(link(&journal, corrupted(5)), config).await;
    let mut sink = MemorySink::new();

    let err = session
        .run_checked_echo(&mut sink, &RunOptions::count(3))
        .await
        .expect_err("item should be abandoned");

    assert!(matches!(err.fault, Fault::RetryLimitExceeded { attempts: 2 }));
    assert_eq!(err.completed, 0);
    let abandoned = err.abandoned.expect("abandoned item is reported");
    assert_eq!(abandoned.attempts, 2);
    assert!(!abandoned.succeeded);
    assert_eq!(abandoned.response_time_ms, 0);
    assert_eq!(journal.writes(), ["Q0005", "R0006", "R0006"]);
    assert!(sink.is_empty());
}

#[rstest]
#[tokio::test]
async fn malformed_frame_is_not_retransmitted(journal: Journal) {
    let replies = [
        Reply::frame(&b"PSTART 17-03-2024 12-00-01 42 no payload PSTOP"[..]),
        Reply::frame(checked_packet(PAYLOAD)),
    ];
    let mut session = start_session(link(&journal, replies), LinkConfig::default()).await;
    let mut sink = MemorySink::new();

    let err = session
        .run_checked_echo(&mut sink, &RunOptions::default())
        .await
        .expect_err("malformed frame should abort");

    assert!(matches!(
        err.fault,
        Fault::MalformedFrame(MalformedFrame::MissingPayloadMarker)
    ));
    assert_eq!(journal.writes(), ["Q0005"]);
}

#[rstest]
#[tokio::test]
async fn send_failure_keeps_earlier_deliveries(journal: Journal) {
    let transport = ScriptedTransport::new(&journal)
        .fail_writes_after(1)
        .reply(Reply::frame(checked_packet(PAYLOAD)));
    let dialer = ScriptedDialer::new(&journal).link(transport);
    let mut session = start_session(dialer, LinkConfig::default()).await;
    let mut sink = MemorySink::new();

    let err = session
        .run_checked_echo(&mut sink, &RunOptions::count(3))
        .await
        .expect_err("second write should fail");

    assert!(matches!(&err.fault, Fault::TransportSendFailure { code } if code == "Q0005"));
    assert_eq!(err.completed, 1);
    assert_eq!(sink.len(), 1);
    assert_eq!(journal.snapshot().dials.len(), 1, "send failures never reconnect");
}

#[rstest]
#[tokio::test]
async fn checksum_above_a_byte_is_retransmitted(journal: Journal) {
    let replies = [
        Reply::frame(&b"PSTART 17-03-2024 12-00-01 42 <0123456789ABCDEF> 999 PSTOP"[..]),
        Reply::frame(checked_packet(PAYLOAD)),
    ];
    let mut session = start_session(link(&journal, replies), LinkConfig::default()).await;
    let mut sink = MemorySink::new();

    let summary = session
        .run_checked_echo(&mut sink, &RunOptions::default())
        .await
        .expect("oversized checksum should be re-requested");

    assert_eq!(summary.completed, 1);
    assert_eq!(sink.deliveries()[0].retry.attempts, 1);
    assert_eq!(journal.writes(), ["Q0005", "R0006"]);
}
