// Sink abstraction
//
// The delivery client only needs one call: submit an ordered list of
// entries and learn, per entry and by position, whether it was accepted.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SinkError;

/// Why the sink refused one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub code: String,
    pub message: Option<String>,
}

/// Outcome for one submitted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryResult {
    Accepted,
    Rejected(Rejection),
}

impl EntryResult {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Sink answer to one batch submission.
///
/// `results[i]` describes the i-th submitted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutBatchResponse {
    pub failed_count: usize,
    pub results: Vec<EntryResult>,
    /// Sink-side id of the call, when the sink reports one
    pub request_id: Option<String>,
}

impl PutBatchResponse {
    pub fn all_accepted(len: usize) -> Self {
        Self {
            failed_count: 0,
            results: vec![EntryResult::Accepted; len],
            request_id: None,
        }
    }

    pub fn rejected_results(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, EntryResult::Rejected(_)))
            .count()
    }
}

/// Streaming ingestion sink accepting batches of opaque records.
///
/// Implementations must be safe to call from concurrent invocations.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn put_batch(&self, stream: &str, entries: &[Bytes])
        -> Result<PutBatchResponse, SinkError>;
}
