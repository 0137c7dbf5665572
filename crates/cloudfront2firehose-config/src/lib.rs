// cloudfront2firehose-config - Unified configuration for the Lambda and the CLI
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from CLOUDFRONT2FIREHOSE_CONFIG env var
// 3. Config file contents from CLOUDFRONT2FIREHOSE_CONFIG_CONTENT env var
// 4. Default config file locations (./config.toml, ./.cloudfront2firehose.toml)
// 5. Platform-specific defaults (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod env_overrides;
mod platform;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX, LEGACY_STREAM_VAR};
pub use platform::Platform;

/// Hard ceilings imposed by Firehose `PutRecordBatch`
pub const FIREHOSE_MAX_RECORDS: usize = 500;
pub const FIREHOSE_MAX_BYTES: usize = 4 * 1024 * 1024;

/// Main runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Delivery stream and retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub stream_name: String,
    #[serde(default = "default_max_batch_records")]
    pub max_batch_records: usize,
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Unset means retry rejected records until they are accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_elapsed_secs: Option<u64>,
}

fn default_max_batch_records() -> usize {
    FIREHOSE_MAX_RECORDS
}

fn default_max_batch_bytes() -> usize {
    FIREHOSE_MAX_BYTES
}

fn default_initial_backoff_ms() -> u64 {
    500
}

impl DeliveryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_elapsed(&self) -> Option<Duration> {
        self.max_elapsed_secs.map(Duration::from_secs)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            stream_name: String::new(),
            max_batch_records: default_max_batch_records(),
            max_batch_bytes: default_max_batch_bytes(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_attempts: None,
            max_elapsed_secs: None,
        }
    }
}

/// How source objects are read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Platform default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<SourceCompression>,
    /// Region for the object store client; the SDK default chain applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl SourceConfig {
    pub fn compression(&self) -> SourceCompression {
        self.compression.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCompression {
    #[default]
    Gzip,
    None,
    Auto,
}

impl std::fmt::Display for SourceCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceCompression::Gzip => write!(f, "gzip"),
            SourceCompression::None => write!(f, "none"),
            SourceCompression::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for SourceCompression {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gzip" | "gz" => Ok(SourceCompression::Gzip),
            "none" | "plain" => Ok(SourceCompression::None),
            "auto" => Ok(SourceCompression::Auto),
            _ => anyhow::bail!("Unsupported compression: {}. Supported: gzip, none, auto", s),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `RUST_LOG`-style filter
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Platform default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn format(&self) -> LogFormat {
        self.format.unwrap_or(LogFormat::Text)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        let platform = Platform::detect();
        sources::load_config(platform)
    }

    /// Load configuration for a specific platform (useful for testing)
    pub fn load_for_platform(platform: Platform) -> Result<Self> {
        sources::load_config(platform)
    }

    /// Layer an explicit config file over platform defaults, then apply
    /// environment overrides. Not validated, so callers can apply their own
    /// overrides first.
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Like `load_from_path` but tolerates a missing config file. Not validated.
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default(Platform::detect())
    }

    /// Construct a config that contains only platform defaults (no env or files).
    pub fn from_platform_defaults(platform: Platform) -> Self {
        let defaults = platform.defaults();
        RuntimeConfig {
            delivery: DeliveryConfig::default(),
            source: SourceConfig {
                compression: Some(defaults.compression),
                region: None,
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: Some(defaults.log_format),
            },
        }
    }

    /// Merge another config into this one (used for TOML layering).
    pub fn merge(&mut self, other: RuntimeConfig) {
        self.delivery = other.delivery;
        if other.source.compression.is_some() {
            self.source.compression = other.source.compression;
        }
        if other.source.region.is_some() {
            self.source.region = other.source.region;
        }
        self.logging.level = other.logging.level;
        if other.logging.format.is_some() {
            self.logging.format = other.logging.format;
        }
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Build a validated configuration from platform defaults, optional
    /// inline TOML and an `EnvSource`, without touching the host environment.
    pub fn load_for_platform_with_env<E: EnvSource>(
        platform: Platform,
        inline_config: Option<&str>,
        env: &E,
    ) -> Result<Self> {
        let mut config = RuntimeConfig::from_platform_defaults(platform);

        if let Some(inline) = inline_config {
            let file_config: RuntimeConfig =
                toml::from_str(inline).context("Failed to parse inline config content")?;
            config.merge(file_config);
        }

        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Render as TOML, for `check-config` style output.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_from_str() {
        assert_eq!(
            "gzip".parse::<SourceCompression>().unwrap(),
            SourceCompression::Gzip
        );
        assert_eq!(
            "GZ".parse::<SourceCompression>().unwrap(),
            SourceCompression::Gzip
        );
        assert_eq!(
            "plain".parse::<SourceCompression>().unwrap(),
            SourceCompression::None
        );
        assert_eq!(
            "auto".parse::<SourceCompression>().unwrap(),
            SourceCompression::Auto
        );
        assert!("zstd".parse::<SourceCompression>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let delivery = DeliveryConfig::default();
        assert_eq!(delivery.max_batch_records, 500);
        assert_eq!(delivery.max_batch_bytes, 4 * 1024 * 1024);
        assert_eq!(delivery.initial_backoff(), Duration::from_millis(500));
        assert_eq!(delivery.max_attempts, None);
        assert_eq!(delivery.max_elapsed(), None);

        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format(), LogFormat::Text);
    }

    #[test]
    fn test_partial_toml_keeps_section_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            [delivery]
            stream_name = "cf-enriched"
            max_attempts = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.delivery.stream_name, "cf-enriched");
        assert_eq!(config.delivery.max_attempts, Some(8));
        assert_eq!(config.delivery.max_batch_records, 500);
        assert_eq!(config.source.compression, None);
        assert_eq!(config.source.compression(), SourceCompression::Gzip);
        assert_eq!(config.logging.format, None);
    }

    #[test]
    fn test_merge_keeps_platform_log_format() {
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Lambda);
        let file: RuntimeConfig = toml::from_str(
            r#"
            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        config.merge(file);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format(), LogFormat::Json);
    }

    #[test]
    fn test_merge_keeps_platform_compression() {
        let file: RuntimeConfig = toml::from_str(
            r#"
            [delivery]
            stream_name = "cf-enriched"
            "#,
        )
        .unwrap();

        let mut local = RuntimeConfig::from_platform_defaults(Platform::Local);
        local.merge(file.clone());
        assert_eq!(local.delivery.stream_name, "cf-enriched");
        assert_eq!(local.source.compression(), SourceCompression::Auto);
        assert_eq!(local.logging.format(), LogFormat::Text);

        let mut lambda = RuntimeConfig::from_platform_defaults(Platform::Lambda);
        lambda.merge(file);
        assert_eq!(lambda.source.compression(), SourceCompression::Gzip);
        assert_eq!(lambda.logging.format(), LogFormat::Json);
    }

    #[test]
    fn test_merge_applies_explicit_source_settings() {
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Local);
        let file: RuntimeConfig = toml::from_str(
            r#"
            [source]
            compression = "none"
            region = "eu-west-1"
            "#,
        )
        .unwrap();
        config.merge(file);
        assert_eq!(config.source.compression(), SourceCompression::None);
        assert_eq!(config.source.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Local);
        config.delivery.stream_name = "cf-enriched".to_string();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("stream_name = \"cf-enriched\""));
        let parsed: RuntimeConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
