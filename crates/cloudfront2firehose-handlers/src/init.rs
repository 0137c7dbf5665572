// Initialization utilities shared by the Lambda and the CLI
//
// Logging/tracing setup, AWS clients and config-to-pipeline wiring

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use cloudfront2firehose_config::{
    DeliveryConfig, LogFormat, LoggingConfig, RuntimeConfig, SourceCompression,
};
use cloudfront2firehose_core::{BatchLimits, Compression};
use cloudfront2firehose_delivery::{DeliveryClient, FirehoseSink, RecordSink, RetryPolicy};
use tracing::info;

use crate::processor::LogProcessor;
use crate::source::ObjectSource;

/// Initialize tracing/logging from LoggingConfig
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.format() {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(false)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}

pub fn compression(setting: SourceCompression) -> Compression {
    match setting {
        SourceCompression::Gzip => Compression::Gzip,
        SourceCompression::None => Compression::None,
        SourceCompression::Auto => Compression::Auto,
    }
}

pub fn retry_policy(config: &DeliveryConfig) -> RetryPolicy {
    let mut policy = RetryPolicy::default().with_initial_backoff(config.initial_backoff());
    if let Some(attempts) = config.max_attempts {
        policy = policy.with_max_attempts(attempts);
    }
    if let Some(elapsed) = config.max_elapsed() {
        policy = policy.with_max_elapsed(elapsed);
    }
    policy
}

pub fn batch_limits(config: &DeliveryConfig) -> BatchLimits {
    BatchLimits::new(config.max_batch_records, config.max_batch_bytes)
}

/// Load the shared AWS SDK configuration (credentials chain, region).
pub async fn load_aws_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

/// Clients reused for every source handled by this process.
#[derive(Debug, Clone)]
pub struct AwsClients {
    pub s3: aws_sdk_s3::Client,
    pub firehose: FirehoseSink,
}

impl AwsClients {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            s3: aws_sdk_s3::Client::new(sdk_config),
            firehose: FirehoseSink::new(aws_sdk_firehose::Client::new(sdk_config)),
        }
    }
}

/// Wire a `LogProcessor` for `source` from the resolved configuration.
pub fn build_processor(
    config: &RuntimeConfig,
    source: Arc<dyn ObjectSource>,
    sink: Arc<dyn RecordSink>,
) -> LogProcessor {
    let delivery = DeliveryClient::new(sink, config.delivery.stream_name.clone())
        .with_retry_policy(retry_policy(&config.delivery));

    LogProcessor::new(source, delivery)
        .with_limits(batch_limits(&config.delivery))
        .with_compression(compression(config.source.compression()))
}

/// Log the effective configuration once at startup.
pub fn log_startup(config: &RuntimeConfig, version: &str) {
    info!(
        version,
        stream = %config.delivery.stream_name,
        max_batch_records = config.delivery.max_batch_records,
        max_batch_bytes = config.delivery.max_batch_bytes,
        initial_backoff_ms = config.delivery.initial_backoff_ms,
        max_attempts = ?config.delivery.max_attempts,
        max_elapsed_secs = ?config.delivery.max_elapsed_secs,
        compression = %config.source.compression(),
        "cloudfront2firehose starting"
    );
}
