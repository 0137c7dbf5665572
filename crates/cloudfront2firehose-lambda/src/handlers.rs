// S3 event handling
//
// Records are processed one after another, each as an independent source.
// A failed source does not stop the others; the invocation still fails
// afterwards so the platform's retry and dead-letter handling apply.

use aws_lambda_events::event::s3::{S3Event, S3EventRecord};
use cloudfront2firehose_handlers::build_processor;
use lambda_runtime::Error;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::response::{InvocationSummary, SourceSummary};
use crate::LambdaState;

/// Decode an object key as it appears in S3 event notifications
/// (form-encoded: spaces as `+`, everything else percent-encoded).
pub fn decode_object_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!(key = raw, error = %e, "Object key is not valid percent-encoded UTF-8; using it as is");
            spaced
        }
    }
}

fn bucket_and_key(record: &S3EventRecord) -> Option<(&str, &str)> {
    let bucket = record.s3.bucket.name.as_deref()?;
    let key = record.s3.object.key.as_deref()?;
    Some((bucket, key))
}

/// Process every object named in `event`.
pub async fn handle_s3_event(event: S3Event, state: &LambdaState) -> Result<Value, Error> {
    let mut summary = InvocationSummary::default();
    info!(records = event.records.len(), "Received S3 event");

    for record in &event.records {
        let Some((bucket, raw_key)) = bucket_and_key(record) else {
            error!(event_name = ?record.event_name, "S3 event record without bucket or key");
            summary.sources.push(SourceSummary::rejected(
                record.s3.bucket.name.as_deref().unwrap_or_default(),
                record.s3.object.key.as_deref().unwrap_or_default(),
                "MalformedRecord",
                "event record is missing the bucket name or object key".to_string(),
            ));
            continue;
        };

        let key = decode_object_key(raw_key);
        let source = state.buckets.for_bucket(bucket);
        let processor = build_processor(&state.config, source, state.sink.clone());

        match processor.process(&key).await {
            Ok(result) => summary
                .sources
                .push(SourceSummary::delivered(bucket, &key, result)),
            Err(err) => {
                error!(
                    bucket,
                    key = %key,
                    error_type = err.error_type(),
                    error = %err,
                    "Failed to process log object"
                );
                summary.sources.push(SourceSummary::failed(bucket, &key, &err));
            }
        }
    }

    let failed: Vec<String> = summary
        .failures()
        .map(|s| format!("s3://{}/{}", s.bucket, s.key))
        .collect();
    if !failed.is_empty() {
        return Err(Error::from(format!(
            "{} of {} log objects failed: {}",
            failed.len(),
            summary.sources.len(),
            failed.join(", ")
        )));
    }

    info!(
        sources = summary.sources.len(),
        records = summary.records_delivered(),
        "Invocation complete"
    );
    serde_json::to_value(&summary).map_err(|e| Error::from(e.to_string()))
}
