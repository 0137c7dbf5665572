// Configuration validation
//
// Validates that required fields are present and values fit Firehose limits

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_delivery_config(&config.delivery)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_delivery_config(config: &DeliveryConfig) -> Result<()> {
    if config.stream_name.trim().is_empty() {
        bail!(
            "delivery.stream_name is required (set {}STREAM_NAME or {})",
            ENV_PREFIX,
            LEGACY_STREAM_VAR
        );
    }

    if config.max_batch_records == 0 || config.max_batch_records > FIREHOSE_MAX_RECORDS {
        bail!(
            "delivery.max_batch_records must be between 1 and {}",
            FIREHOSE_MAX_RECORDS
        );
    }

    if config.max_batch_bytes == 0 || config.max_batch_bytes > FIREHOSE_MAX_BYTES {
        bail!(
            "delivery.max_batch_bytes must be between 1 and {}",
            FIREHOSE_MAX_BYTES
        );
    }

    if config.initial_backoff_ms == 0 {
        bail!("delivery.initial_backoff_ms must be greater than 0");
    }

    if config.max_attempts == Some(0) {
        bail!("delivery.max_attempts must be greater than 0 when set");
    }

    if config.max_elapsed_secs == Some(0) {
        bail!("delivery.max_elapsed_secs must be greater than 0 when set");
    }

    if config.max_attempts.is_some() || config.max_elapsed_secs.is_some() {
        warn!(
            max_attempts = ?config.max_attempts,
            max_elapsed_secs = ?config.max_elapsed_secs,
            "Retry cap configured; records still rejected when it is reached fail the invocation"
        );
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if config.level.trim().is_empty() {
        bail!("logging.level must not be empty");
    }
    Ok(())
}
