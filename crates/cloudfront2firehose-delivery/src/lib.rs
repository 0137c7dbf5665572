//! Batched delivery to a streaming ingestion sink
//!
//! A batch is submitted in one call. The sink answers with one result per
//! record; rejected records are resubmitted, alone and in their original
//! order, after an exponentially growing wait until the sink accepts all of
//! them or the configured `RetryPolicy` gives up. Call-level failures are
//! never retried here.

mod client;
mod error;
mod firehose;
mod retry;
mod sink;

pub use client::{DeliveryClient, DeliveryReport};
pub use error::{DeliveryError, SinkError};
pub use firehose::FirehoseSink;
pub use retry::{Backoff, RetryPolicy, DEFAULT_INITIAL_BACKOFF};
pub use sink::{EntryResult, PutBatchResponse, RecordSink, Rejection};
