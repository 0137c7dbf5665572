//! Error types for batch delivery

use thiserror::Error;

/// The sink call itself failed (network, credentials, missing stream,
/// call-level throttling). Distinct from per-record rejections.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("PutRecordBatch to '{stream}' failed: {message}")]
    Request { stream: String, message: String },

    #[error("record {index} could not be encoded for the sink: {message}")]
    InvalidRecord { index: usize, message: String },
}

/// Delivery of a batch stopped before every record was accepted.
///
/// Records accepted by earlier attempts stay accepted.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Call-level failure; not retried
    #[error("submission failed on attempt {attempt}: {source}")]
    Submission {
        attempt: u32,
        #[source]
        source: SinkError,
    },

    /// The sink answered with results that cannot be mapped back onto the
    /// submitted records by position.
    #[error(
        "sink response does not match submission: {submitted} records sent, \
         {results} results returned, failed count {failed_count}, {rejected} rejected results"
    )]
    ResponseMismatch {
        submitted: usize,
        results: usize,
        failed_count: usize,
        rejected: usize,
    },

    /// Only possible when the retry policy caps attempts or elapsed time
    #[error(
        "{rejected} records still rejected after {attempts} attempts (last error code: {last_code})"
    )]
    RetriesExhausted {
        attempts: u32,
        rejected: usize,
        last_code: String,
    },

    #[error("delivery cancelled with {rejected} records awaiting retry")]
    Cancelled { rejected: usize },
}

impl DeliveryError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Submission { .. } => "submission",
            Self::ResponseMismatch { .. } => "response_mismatch",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}
