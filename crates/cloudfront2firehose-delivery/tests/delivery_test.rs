// Integration tests for cloudfront2firehose-delivery
//
// Drives the retry loop against a scripted sink on a paused clock

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cloudfront2firehose_core::{
    BatchLimits, Batches, EnrichedRecord, SourceIdentity, UserAgentInfo,
};
use cloudfront2firehose_delivery::{
    DeliveryClient, DeliveryError, EntryResult, PutBatchResponse, RecordSink, Rejection,
    RetryPolicy, SinkError,
};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const STREAM: &str = "cloudfront-enriched";

/// Scripted answer for one sink call
enum Step {
    AcceptAll,
    /// Reject the entries at these positions
    Reject(Vec<usize>),
    Fail(&'static str),
    /// Claim one result fewer than submitted
    Truncate,
}

#[derive(Default)]
struct ScriptedSink {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Vec<Bytes>>>,
}

impl ScriptedSink {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::default(),
        })
    }

    fn calls(&self) -> Vec<Vec<Bytes>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RecordSink for ScriptedSink {
    async fn put_batch(
        &self,
        stream: &str,
        entries: &[Bytes],
    ) -> Result<PutBatchResponse, SinkError> {
        assert_eq!(stream, STREAM);
        self.calls.lock().push(entries.to_vec());
        let step = self.steps.lock().pop_front().unwrap_or(Step::AcceptAll);
        match step {
            Step::AcceptAll => Ok(PutBatchResponse::all_accepted(entries.len())),
            Step::Reject(positions) => {
                let results = (0..entries.len())
                    .map(|i| {
                        if positions.contains(&i) {
                            EntryResult::Rejected(Rejection {
                                code: "ServiceUnavailableException".into(),
                                message: Some("Slow down.".into()),
                            })
                        } else {
                            EntryResult::Accepted
                        }
                    })
                    .collect();
                Ok(PutBatchResponse {
                    failed_count: positions.len(),
                    results,
                    request_id: None,
                })
            }
            Step::Fail(message) => Err(SinkError::Request {
                stream: stream.to_string(),
                message: message.to_string(),
            }),
            Step::Truncate => Ok(PutBatchResponse::all_accepted(entries.len() - 1)),
        }
    }
}

fn entries(n: usize) -> Vec<Bytes> {
    (0..n)
        .map(|i| Bytes::from(format!("line-{}\tChrome\tWindows 10\tFalse\n", i)))
        .collect()
}

fn client(sink: Arc<ScriptedSink>) -> DeliveryClient {
    DeliveryClient::new(sink, STREAM)
}

#[tokio::test(start_paused = true)]
async fn full_acceptance_needs_one_call() {
    let sink = ScriptedSink::new(vec![Step::AcceptAll]);
    let started = Instant::now();

    let report = client(sink.clone()).deliver_entries(entries(500)).await.unwrap();

    assert_eq!(report.records, 500);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.retried_records, 0);
    assert_eq!(report.total_backoff, Duration::ZERO);
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(sink.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn partial_failure_resubmits_only_rejected_records() {
    let sink = ScriptedSink::new(vec![Step::Reject(vec![7, 123, 499]), Step::AcceptAll]);
    let sent = entries(500);
    let started = Instant::now();

    let report = client(sink.clone()).deliver_entries(sent.clone()).await.unwrap();

    let calls = sink.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], sent);
    assert_eq!(
        calls[1],
        vec![sent[7].clone(), sent[123].clone(), sent[499].clone()]
    );
    assert_eq!(report.attempts, 2);
    assert_eq!(report.retried_records, 3);
    assert_eq!(report.total_backoff, Duration::from_millis(500));
    assert!(started.elapsed() >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_between_rounds() {
    let sink = ScriptedSink::new(vec![
        Step::Reject(vec![0, 1, 2, 3]),
        Step::Reject(vec![1, 3]),
        Step::Reject(vec![0]),
        Step::AcceptAll,
    ]);
    let sent = entries(10);
    let started = Instant::now();

    let report = client(sink.clone()).deliver_entries(sent.clone()).await.unwrap();

    let calls = sink.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[1], sent[0..4].to_vec());
    assert_eq!(calls[2], vec![sent[1].clone(), sent[3].clone()]);
    assert_eq!(calls[3], vec![sent[1].clone()]);
    assert_eq!(report.retried_records, 4 + 2 + 1);
    assert_eq!(report.total_backoff, Duration::from_millis(500 + 1000 + 2000));
    assert!(started.elapsed() >= Duration::from_millis(3500));
}

#[tokio::test(start_paused = true)]
async fn submission_failure_is_not_retried() {
    let sink = ScriptedSink::new(vec![Step::Fail("ResourceNotFoundException")]);

    let err = client(sink.clone())
        .deliver_entries(entries(20))
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::Submission { attempt: 1, .. }));
    assert_eq!(sink.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn submission_failure_during_retry_is_fatal() {
    let sink = ScriptedSink::new(vec![Step::Reject(vec![2]), Step::Fail("AccessDenied")]);

    let err = client(sink.clone())
        .deliver_entries(entries(5))
        .await
        .unwrap_err();

    match err {
        DeliveryError::Submission { attempt, source } => {
            assert_eq!(attempt, 2);
            assert!(source.to_string().contains("AccessDenied"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(sink.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn short_response_is_a_mismatch() {
    let sink = ScriptedSink::new(vec![Step::Truncate]);

    let err = client(sink).deliver_entries(entries(4)).await.unwrap_err();

    assert!(matches!(
        err,
        DeliveryError::ResponseMismatch {
            submitted: 4,
            results: 3,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn attempt_cap_reports_remaining_rejections() {
    let sink = ScriptedSink::new(vec![
        Step::Reject(vec![0, 1]),
        Step::Reject(vec![0, 1]),
        Step::Reject(vec![1]),
    ]);

    let err = client(sink.clone())
        .with_retry_policy(RetryPolicy::default().with_max_attempts(3))
        .deliver_entries(entries(3))
        .await
        .unwrap_err();

    match err {
        DeliveryError::RetriesExhausted {
            attempts,
            rejected,
            last_code,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(rejected, 1);
            assert_eq!(last_code, "ServiceUnavailableException");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(sink.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn elapsed_cap_stops_before_overlong_wait() {
    let sink = ScriptedSink::new(vec![
        Step::Reject(vec![0]),
        Step::Reject(vec![0]),
        Step::Reject(vec![0]),
    ]);
    let policy = RetryPolicy::default().with_max_elapsed(Duration::from_millis(1600));

    let err = client(sink.clone())
        .with_retry_policy(policy)
        .deliver_entries(entries(1))
        .await
        .unwrap_err();

    // 500 ms + 1000 ms fit, the following 2000 ms wait does not
    assert!(matches!(
        err,
        DeliveryError::RetriesExhausted { attempts: 3, .. }
    ));
    assert_eq!(sink.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_backoff() {
    let sink = ScriptedSink::new(vec![Step::Reject(vec![0, 1])]);
    let token = CancellationToken::new();
    token.cancel();

    let err = client(sink.clone())
        .with_cancellation(token)
        .deliver_entries(entries(2))
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::Cancelled { rejected: 2 }));
    assert_eq!(sink.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn delivers_enriched_batches() {
    let source = SourceIdentity::from_key("logs/E1ABC.2024-03-01-10.0f0f0f.gz");
    let info = UserAgentInfo {
        browser_family: "Firefox".into(),
        os_family: "Linux".into(),
        is_automated: false,
    };
    let records = (0..750).map(|i| {
        let line = format!("2024-03-01\t10:00:00\tLHR\t{}\t198.51.100.4\tGET\th\t/\t200\t-\tUA", i);
        EnrichedRecord::new(&line, &info, &source)
    });
    let sink = ScriptedSink::new(vec![Step::AcceptAll, Step::Reject(vec![249]), Step::AcceptAll]);
    let client = client(sink.clone());

    let mut reports = Vec::new();
    for batch in Batches::new(records, BatchLimits::default()) {
        reports.push(client.deliver(batch).await.unwrap());
    }

    let sizes: Vec<usize> = sink.calls().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![500, 250, 1]);
    assert_eq!(reports[1].retried_records, 1);
    let resent = String::from_utf8(sink.calls()[2][0].to_vec()).unwrap();
    assert!(resent.starts_with("2024-03-01\t10:00:00\tLHR\t749\t"));
    assert!(resent.ends_with("\tFirefox\tLinux\tFalse\tlogs/E1ABC.2024-03-01-10.0f0f0f.gz\tE1ABC\n"));
}
