// Invocation summary returned to the Lambda runtime

use cloudfront2firehose_handlers::{PipelineError, ProcessingResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOutcome {
    Delivered,
    Failed,
}

/// Outcome for one object named in the event
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub bucket: String,
    pub key: String,
    pub status: SourceOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceSummary {
    pub fn delivered(bucket: &str, key: &str, result: ProcessingResult) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            status: SourceOutcome::Delivered,
            result: Some(result),
            error_type: None,
            error: None,
        }
    }

    pub fn failed(bucket: &str, key: &str, err: &PipelineError) -> Self {
        Self::rejected(bucket, key, err.error_type(), err.to_string())
    }

    /// Event record that could not be turned into a source
    pub fn rejected(bucket: &str, key: &str, error_type: &'static str, error: String) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            status: SourceOutcome::Failed,
            result: None,
            error_type: Some(error_type),
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == SourceOutcome::Failed
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InvocationSummary {
    pub sources: Vec<SourceSummary>,
}

impl InvocationSummary {
    pub fn failures(&self) -> impl Iterator<Item = &SourceSummary> {
        self.sources.iter().filter(|s| s.is_failed())
    }

    pub fn records_delivered(&self) -> usize {
        self.sources
            .iter()
            .filter_map(|s| s.result.as_ref())
            .map(|r| r.records_enriched)
            .sum()
    }
}
