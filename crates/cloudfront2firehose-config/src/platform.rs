// Platform detection based on environment variables
//
// - AWS Lambda: AWS_LAMBDA_FUNCTION_NAME env var present
// - Local: anything else (replay CLI, tests)

use std::env;

use crate::{LogFormat, SourceCompression};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Lambda,
    Local,
}

impl Platform {
    /// Auto-detect the current platform based on environment variables
    pub fn detect() -> Self {
        if env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
            Platform::Lambda
        } else {
            Platform::Local
        }
    }

    /// Get platform-specific defaults
    pub fn defaults(&self) -> PlatformDefaults {
        match self {
            // CloudWatch ingests one JSON object per line
            Platform::Lambda => PlatformDefaults {
                log_format: LogFormat::Json,
                compression: SourceCompression::Gzip,
            },
            Platform::Local => PlatformDefaults {
                log_format: LogFormat::Text,
                compression: SourceCompression::Auto,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformDefaults {
    pub log_format: LogFormat,
    pub compression: SourceCompression,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_defaults() {
        let lambda = Platform::Lambda.defaults();
        assert_eq!(lambda.log_format, LogFormat::Json);
        assert_eq!(lambda.compression, SourceCompression::Gzip);

        let local = Platform::Local.defaults();
        assert_eq!(local.log_format, LogFormat::Text);
        assert_eq!(local.compression, SourceCompression::Auto);
    }
}
