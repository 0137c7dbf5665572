use std::sync::Arc;

use cloudfront2firehose_core::{
    decompress, lines, Batch, BatchLimits, Batcher, Compression, EnrichOutcome, Enricher,
    SkipReason, SourceIdentity, UserAgentClassifier, WootheeClassifier,
};
use cloudfront2firehose_delivery::{DeliveryClient, DeliveryError};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::PipelineError;
use crate::source::ObjectSource;

/// Skipped lines, per reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub comment: usize,
    pub blank: usize,
    pub invalid_utf8: usize,
    pub missing_columns: usize,
    pub unclassifiable: usize,
}

impl SkipCounts {
    pub fn record(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::Comment => self.comment += 1,
            SkipReason::Blank => self.blank += 1,
            SkipReason::InvalidUtf8 => self.invalid_utf8 += 1,
            SkipReason::MissingColumns { .. } => self.missing_columns += 1,
            SkipReason::Unclassifiable(_) => self.unclassifiable += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.comment + self.blank + self.invalid_utf8 + self.missing_columns + self.unclassifiable
    }

    /// Skips other than comments and blank lines
    pub fn unexpected(&self) -> usize {
        self.invalid_utf8 + self.missing_columns + self.unclassifiable
    }
}

/// Result of processing one source object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    pub source_key: String,
    pub lines_read: usize,
    pub records_enriched: usize,
    pub skipped: SkipCounts,
    pub batches_delivered: usize,
    pub records_retried: usize,
}

impl ProcessingResult {
    fn new(source_key: &str) -> Self {
        Self {
            source_key: source_key.to_string(),
            lines_read: 0,
            records_enriched: 0,
            skipped: SkipCounts::default(),
            batches_delivered: 0,
            records_retried: 0,
        }
    }
}

/// Fetch, decompress, enrich, batch and deliver one log object at a time.
///
/// At most one batch is in flight: each sealed batch is delivered before
/// more lines are read.
pub struct LogProcessor {
    source: Arc<dyn ObjectSource>,
    classifier: Arc<dyn UserAgentClassifier>,
    delivery: DeliveryClient,
    limits: BatchLimits,
    compression: Compression,
    cancel: Option<CancellationToken>,
}

impl LogProcessor {
    pub fn new(source: Arc<dyn ObjectSource>, delivery: DeliveryClient) -> Self {
        Self {
            source,
            classifier: Arc::new(WootheeClassifier),
            delivery,
            limits: BatchLimits::default(),
            compression: Compression::default(),
            cancel: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn UserAgentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Stop between batches, or during a backoff wait, once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.delivery = self.delivery.with_cancellation(token.clone());
        self.cancel = Some(token);
        self
    }

    pub async fn process(&self, key: &str) -> Result<ProcessingResult, PipelineError> {
        let location = self.source.locate(key);
        info!(source = %location, "Processing log object");

        let raw = self.source.fetch(key).await?;
        let text = decompress(&raw, self.compression).map_err(|source| PipelineError::Decode {
            key: key.to_string(),
            source,
        })?;
        debug!(
            source = %location,
            compressed_bytes = raw.len(),
            decompressed_bytes = text.len(),
            "Fetched log object"
        );
        drop(raw);

        let enricher = Enricher::new(self.classifier.clone(), SourceIdentity::from_key(key));
        let mut batcher = Batcher::new(self.limits);
        let mut result = ProcessingResult::new(key);

        for (index, line) in lines(&text).enumerate() {
            result.lines_read += 1;
            match enricher.enrich_line(line) {
                EnrichOutcome::Record(record) => {
                    result.records_enriched += 1;
                    if let Some(batch) = batcher.push(record) {
                        self.deliver(batch, &mut result).await?;
                    }
                }
                EnrichOutcome::Skip(reason) => {
                    if reason.is_expected() {
                        trace!(line = index + 1, reason = reason.as_str(), "Skipping line");
                    } else {
                        debug!(
                            source = %location,
                            line = index + 1,
                            reason = reason.as_str(),
                            detail = %reason,
                            "Skipping line"
                        );
                    }
                    result.skipped.record(&reason);
                }
            }
        }

        if let Some(batch) = batcher.flush() {
            self.deliver(batch, &mut result).await?;
        }

        info!(
            source = %location,
            lines = result.lines_read,
            records = result.records_enriched,
            skipped = result.skipped.total(),
            unexpected_skips = result.skipped.unexpected(),
            batches = result.batches_delivered,
            retried = result.records_retried,
            stream = self.delivery.stream_name(),
            "Finished log object"
        );
        Ok(result)
    }

    async fn deliver(&self, batch: Batch, result: &mut ProcessingResult) -> Result<(), PipelineError> {
        let failed = |source: DeliveryError, result: &ProcessingResult| PipelineError::Delivery {
            key: result.source_key.clone(),
            batches_delivered: result.batches_delivered,
            source,
        };

        if let Some(cancel) = &self.cancel {
            if cancel.is_cancelled() {
                return Err(failed(
                    DeliveryError::Cancelled {
                        rejected: batch.len(),
                    },
                    result,
                ));
            }
        }

        let report = self
            .delivery
            .deliver(batch)
            .await
            .map_err(|source| failed(source, result))?;

        result.batches_delivered += 1;
        result.records_retried += report.retried_records;
        debug!(
            records = report.records,
            attempts = report.attempts,
            backoff_ms = report.total_backoff.as_millis() as u64,
            "Delivered batch"
        );
        Ok(())
    }
}

impl std::fmt::Debug for LogProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogProcessor")
            .field("delivery", &self.delivery)
            .field("limits", &self.limits)
            .field("compression", &self.compression)
            .finish()
    }
}
