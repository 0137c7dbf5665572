// Configuration source loading from the host environment and filesystem.
//
// Priority order:
// 1. Environment variables (CLOUDFRONT2FIREHOSE_* prefix, KINESIS_FIREHOSE_STREAM)
// 2. Config file path from CLOUDFRONT2FIREHOSE_CONFIG
// 3. Inline config content from CLOUDFRONT2FIREHOSE_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.cloudfront2firehose.toml)
// 5. Platform defaults (based on auto-detected Platform)

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::platform::Platform;
use crate::*;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_PATHS: &[&str] = &["./config.toml", "./.cloudfront2firehose.toml"];

/// Load and validate configuration for `platform`.
pub fn load_config(platform: Platform) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::from_platform_defaults(platform);

    if let Some(file_config) = load_from_file()? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file() -> Result<Option<RuntimeConfig>> {
    if let Ok(path) = env::var("CLOUDFRONT2FIREHOSE_CONFIG") {
        return read_toml(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("CLOUDFRONT2FIREHOSE_CONFIG_CONTENT") {
        let config: RuntimeConfig = toml::from_str(&content)
            .context("Failed to parse inline config from CLOUDFRONT2FIREHOSE_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_PATHS {
        let path = Path::new(path);
        if path.exists() {
            return read_toml(path).map(Some);
        }
    }

    Ok(None)
}

fn read_toml(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for the CLI --config flag).
/// Errors if the file is missing or malformed. The result is not validated.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = layer_file(Platform::detect(), path.as_ref())?;
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

/// Platform defaults with the file at `path` merged over them.
fn layer_file(platform: Platform, path: &Path) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::from_platform_defaults(platform);
    config.merge(read_toml(path)?);
    Ok(config)
}

/// Load configuration with graceful fallback to defaults. Not validated.
pub fn load_or_default(platform: Platform) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::from_platform_defaults(platform);

    if let Some(file_config) = load_from_file()? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}
