//! Enriched record layout
//!
//! An enriched record is the original tab-separated log line followed by
//! five derived columns and a trailing newline:
//!
//! ```text
//! <original fields...>\t<browser>\t<os>\t<automated>\t<source key>\t<short name>\n
//! ```

use std::fmt;
use std::sync::Arc;

use crate::classify::UserAgentInfo;

/// 0-based column holding the user agent (`cs(User-Agent)` in CloudFront logs).
pub const USER_AGENT_COLUMN: usize = 10;

/// Lines with fewer columns than this carry no user agent and are skipped.
pub const MIN_COLUMNS: usize = USER_AGENT_COLUMN + 1;

/// Identity of the object a record was read from.
///
/// The short name is the last path segment of the key cut at its first `.`,
/// which for CloudFront standard logs is the distribution id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    key: Arc<str>,
    short_name: Arc<str>,
}

impl SourceIdentity {
    pub fn from_key(key: &str) -> Self {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        let short_name = file_name.split('.').next().unwrap_or(file_name);
        Self {
            key: Arc::from(key),
            short_name: Arc::from(short_name),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }
}

/// One log line plus its derived fields, newline-terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    data: String,
}

impl EnrichedRecord {
    /// Build the wire form from an already trimmed line.
    pub fn new(line: &str, agent: &UserAgentInfo, source: &SourceIdentity) -> Self {
        let automated = if agent.is_automated { "True" } else { "False" };
        let mut data = String::with_capacity(
            line.len()
                + agent.browser_family.len()
                + agent.os_family.len()
                + source.key().len()
                + source.short_name().len()
                + 16,
        );
        for (idx, field) in [
            line,
            agent.browser_family.as_str(),
            agent.os_family.as_str(),
            automated,
            source.key(),
            source.short_name(),
        ]
        .into_iter()
        .enumerate()
        {
            if idx > 0 {
                data.push('\t');
            }
            data.push_str(field);
        }
        data.push('\n');
        Self { data }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Encoded size in bytes, newline included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data.into_bytes()
    }
}

impl fmt::Display for EnrichedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}
