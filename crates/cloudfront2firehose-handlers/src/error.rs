use cloudfront2firehose_core::DecodeError;
use cloudfront2firehose_delivery::DeliveryError;
use thiserror::Error;

use crate::source::FetchError;

/// Fatal failure while processing one source object.
///
/// Batches delivered before the failure stay delivered.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to decompress {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },

    #[error("delivery failed for {key} after {batches_delivered} delivered batches: {source}")]
    Delivery {
        key: String,
        batches_delivered: usize,
        #[source]
        source: DeliveryError,
    },
}

impl PipelineError {
    /// Error type string for summaries
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::NotFound { .. }) => "NotFound",
            Self::Fetch(FetchError::Store { .. }) => "FetchFailed",
            Self::Decode { .. } => "DecodeFailed",
            Self::Delivery { source, .. } => match source {
                DeliveryError::Submission { .. } => "SubmissionFailed",
                DeliveryError::ResponseMismatch { .. } => "ResponseMismatch",
                DeliveryError::RetriesExhausted { .. } => "RetriesExhausted",
                DeliveryError::Cancelled { .. } => "Cancelled",
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Delivery {
                source: DeliveryError::Cancelled { .. },
                ..
            }
        )
    }
}
