//! Error types for decoding and classification

use thiserror::Error;

/// Failure to turn the fetched object into text lines.
///
/// Always fatal for the source being processed.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The gzip stream was truncated or corrupt
    #[error("gzip decompression failed: {0}")]
    Gzip(#[source] std::io::Error),
}

/// Failure to classify a user-agent string.
///
/// Never fatal: the line carrying the user agent is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("user agent could not be parsed: {0}")]
    Unparseable(String),
}
