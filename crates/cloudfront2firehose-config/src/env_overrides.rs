use super::{LogFormat, RuntimeConfig, SourceCompression};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "CLOUDFRONT2FIREHOSE_";

/// Unprefixed stream variable understood by existing deployments
pub const LEGACY_STREAM_VAR: &str = "KINESIS_FIREHOSE_STREAM";

/// Abstraction over environment-variable lookups so tests can supply a map
/// instead of mutating the process environment.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the CLOUDFRONT2FIREHOSE_ prefix
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Delivery stream; the prefixed variable wins over the legacy one
    if let Some(stream) = get_env_string(env, "STREAM_NAME")? {
        config.delivery.stream_name = stream;
    } else if let Some(stream) = env.get_raw(LEGACY_STREAM_VAR) {
        config.delivery.stream_name = stream;
    }

    // Batching and retry
    if let Some(val) = get_env_usize(env, "MAX_BATCH_RECORDS")? {
        config.delivery.max_batch_records = val;
    }
    if let Some(val) = get_env_usize(env, "MAX_BATCH_BYTES")? {
        config.delivery.max_batch_bytes = val;
    }
    if let Some(val) = get_env_u64(env, "INITIAL_BACKOFF_MS")? {
        config.delivery.initial_backoff_ms = val;
    }
    if let Some(val) = get_env_u64(env, "MAX_ATTEMPTS")? {
        let attempts =
            u32::try_from(val).map_err(|_| anyhow!("{}MAX_ATTEMPTS is too large", ENV_PREFIX))?;
        config.delivery.max_attempts = Some(attempts);
    }
    if let Some(val) = get_env_u64(env, "MAX_ELAPSED_SECS")? {
        config.delivery.max_elapsed_secs = Some(val);
    }

    // Source
    if let Some(compression) = get_env_string(env, "COMPRESSION")? {
        config.source.compression = Some(
            compression
                .parse::<SourceCompression>()
                .context("Invalid CLOUDFRONT2FIREHOSE_COMPRESSION value")?,
        );
    }
    if let Some(region) = get_env_string(env, "REGION")? {
        config.source.region = Some(region);
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL")? {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT")? {
        config.logging.format = Some(
            format
                .parse::<LogFormat>()
                .context("Invalid CLOUDFRONT2FIREHOSE_LOG_FORMAT value")?,
        );
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Result<Option<String>> {
    Ok(env.get(key))
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val
                .parse::<usize>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key)? {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
