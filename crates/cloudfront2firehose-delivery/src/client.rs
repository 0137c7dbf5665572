// Delivery client
//
// Submits one batch and resubmits the rejected subset until nothing is left.
// Entries are matched to results by position, so each resubmission keeps the
// original relative order of the records it carries.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cloudfront2firehose_core::Batch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DeliveryError;
use crate::retry::RetryPolicy;
use crate::sink::{EntryResult, PutBatchResponse, RecordSink};

/// Summary of one successful batch delivery.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    /// Records in the batch
    pub records: usize,
    /// Sink calls made, first submission included
    pub attempts: u32,
    /// Sum over all retries of the number of records resubmitted
    pub retried_records: usize,
    pub total_backoff: Duration,
}

#[derive(Clone)]
pub struct DeliveryClient {
    sink: Arc<dyn RecordSink>,
    stream_name: Arc<str>,
    policy: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for DeliveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryClient")
            .field("stream_name", &self.stream_name)
            .field("policy", &self.policy)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl DeliveryClient {
    pub fn new(sink: Arc<dyn RecordSink>, stream_name: impl Into<String>) -> Self {
        Self {
            sink,
            stream_name: Arc::from(stream_name.into()),
            policy: RetryPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Abort backoff waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Deliver every record of `batch`.
    ///
    /// Returns once the sink has accepted all records. A call-level sink
    /// failure is returned immediately, whichever attempt it happens on.
    pub async fn deliver(&self, batch: Batch) -> Result<DeliveryReport, DeliveryError> {
        let entries = batch
            .into_records()
            .into_iter()
            .map(|record| Bytes::from(record.into_bytes()))
            .collect();
        self.deliver_entries(entries).await
    }

    pub async fn deliver_entries(&self, entries: Vec<Bytes>) -> Result<DeliveryReport, DeliveryError> {
        let mut report = DeliveryReport {
            records: entries.len(),
            ..Default::default()
        };
        if entries.is_empty() {
            return Ok(report);
        }

        let started = Instant::now();
        let mut backoff = self.policy.backoff();
        let mut pending = entries;

        loop {
            report.attempts += 1;
            let response = self
                .sink
                .put_batch(&self.stream_name, &pending)
                .await
                .map_err(|source| DeliveryError::Submission {
                    attempt: report.attempts,
                    source,
                })?;

            let submitted = pending.len();
            let (rejected, first_code) = split_rejected(pending, &response)?;
            if rejected.is_empty() {
                debug!(
                    stream = %self.stream_name,
                    records = report.records,
                    attempts = report.attempts,
                    "Batch accepted"
                );
                return Ok(report);
            }

            let wait = backoff.peek();
            if !self
                .policy
                .allows_retry(report.attempts, started.elapsed(), wait)
            {
                return Err(DeliveryError::RetriesExhausted {
                    attempts: report.attempts,
                    rejected: rejected.len(),
                    last_code: first_code,
                });
            }
            let wait = backoff.advance();

            warn!(
                stream = %self.stream_name,
                failed = rejected.len(),
                submitted,
                attempt = report.attempts,
                backoff_ms = wait.as_millis() as u64,
                error_code = %first_code,
                request_id = response.request_id.as_deref().unwrap_or("-"),
                "Records rejected, resubmitting rejected subset"
            );

            if let Some(cancel) = &self.cancel {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(DeliveryError::Cancelled { rejected: rejected.len() });
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            } else {
                tokio::time::sleep(wait).await;
            }

            report.total_backoff += wait;
            report.retried_records += rejected.len();
            pending = rejected;
        }
    }
}

/// Keep the entries whose result is a rejection, in submission order.
///
/// Also returns the error code of the first rejection for diagnostics.
fn split_rejected(
    pending: Vec<Bytes>,
    response: &PutBatchResponse,
) -> Result<(Vec<Bytes>, String), DeliveryError> {
    let mismatch = |pending: usize| DeliveryError::ResponseMismatch {
        submitted: pending,
        results: response.results.len(),
        failed_count: response.failed_count,
        rejected: response.rejected_results(),
    };

    if response.results.len() != pending.len() {
        return Err(mismatch(pending.len()));
    }
    let submitted = pending.len();

    let mut first_code = String::new();
    let rejected: Vec<Bytes> = pending
        .into_iter()
        .zip(&response.results)
        .filter_map(|(entry, result)| match result {
            EntryResult::Accepted => None,
            EntryResult::Rejected(rejection) => {
                if first_code.is_empty() {
                    first_code.clone_from(&rejection.code);
                }
                Some(entry)
            }
        })
        .collect();

    if rejected.len() != response.failed_count {
        return Err(mismatch(submitted));
    }
    Ok((rejected, first_code))
}
