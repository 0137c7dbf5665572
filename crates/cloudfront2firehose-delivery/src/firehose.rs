//! Kinesis Data Firehose sink backed by `PutRecordBatch`

use async_trait::async_trait;
use aws_sdk_firehose::error::DisplayErrorContext;
use aws_sdk_firehose::operation::RequestId;
use aws_sdk_firehose::primitives::Blob;
use aws_sdk_firehose::types::Record;
use aws_sdk_firehose::Client;
use bytes::Bytes;

use crate::error::SinkError;
use crate::sink::{EntryResult, PutBatchResponse, RecordSink, Rejection};

/// `RecordSink` over an AWS SDK Firehose client.
///
/// The client is cheap to clone and reused for every batch of every
/// invocation handled by the same process.
#[derive(Debug, Clone)]
pub struct FirehoseSink {
    client: Client,
}

impl FirehoseSink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordSink for FirehoseSink {
    async fn put_batch(
        &self,
        stream: &str,
        entries: &[Bytes],
    ) -> Result<PutBatchResponse, SinkError> {
        let records = entries
            .iter()
            .enumerate()
            .map(|(index, data)| {
                Record::builder()
                    .data(Blob::new(data.to_vec()))
                    .build()
                    .map_err(|e| SinkError::InvalidRecord {
                        index,
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .put_record_batch()
            .delivery_stream_name(stream)
            .set_records(Some(records))
            .send()
            .await
            .map_err(|e| SinkError::Request {
                stream: stream.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let results = output
            .request_responses()
            .iter()
            .map(|entry| match entry.error_code() {
                Some(code) => EntryResult::Rejected(Rejection {
                    code: code.to_string(),
                    message: entry.error_message().map(str::to_string),
                }),
                None => EntryResult::Accepted,
            })
            .collect();

        Ok(PutBatchResponse {
            failed_count: usize::try_from(output.failed_put_count()).unwrap_or_default(),
            results,
            request_id: output.request_id().map(str::to_string),
        })
    }
}
