//! Line enrichment
//!
//! `Enricher::enrich_line` is a total function: every input line maps to
//! either an `EnrichedRecord` or a `SkipReason`. Skips are never errors; the
//! caller decides how loudly to report them.

use std::fmt;
use std::sync::Arc;

use crate::classify::UserAgentClassifier;
use crate::error::ClassifyError;
use crate::record::{EnrichedRecord, SourceIdentity, MIN_COLUMNS, USER_AGENT_COLUMN};

/// Why a line produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `#Version` / `#Fields` header or any other `#` line
    Comment,
    /// Empty or whitespace-only line
    Blank,
    InvalidUtf8,
    MissingColumns { found: usize },
    Unclassifiable(ClassifyError),
}

impl SkipReason {
    /// Stable label for logs and counters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Blank => "blank",
            Self::InvalidUtf8 => "invalid_utf8",
            Self::MissingColumns { .. } => "missing_columns",
            Self::Unclassifiable(_) => "unclassifiable",
        }
    }

    /// Comments and blank lines are expected in every log file.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Comment | Self::Blank)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comment => f.write_str("comment line"),
            Self::Blank => f.write_str("blank line"),
            Self::InvalidUtf8 => f.write_str("line is not valid UTF-8"),
            Self::MissingColumns { found } => write!(
                f,
                "expected at least {} tab-separated columns, found {}",
                MIN_COLUMNS, found
            ),
            Self::Unclassifiable(err) => write!(f, "{}", err),
        }
    }
}

/// Outcome of enriching one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    Record(EnrichedRecord),
    Skip(SkipReason),
}

impl EnrichOutcome {
    pub fn into_record(self) -> Option<EnrichedRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Skip(_) => None,
        }
    }
}

/// Enriches the lines of a single source object.
#[derive(Clone)]
pub struct Enricher {
    classifier: Arc<dyn UserAgentClassifier>,
    source: SourceIdentity,
}

impl Enricher {
    pub fn new(classifier: Arc<dyn UserAgentClassifier>, source: SourceIdentity) -> Self {
        Self { classifier, source }
    }

    /// Enrich a raw line (without its `\n`).
    pub fn enrich_line(&self, raw: &[u8]) -> EnrichOutcome {
        if raw.first() == Some(&b'#') {
            return EnrichOutcome::Skip(SkipReason::Comment);
        }
        match std::str::from_utf8(raw) {
            Ok(line) => self.enrich_str(line),
            Err(_) => EnrichOutcome::Skip(SkipReason::InvalidUtf8),
        }
    }

    /// Enrich an already decoded line.
    pub fn enrich_str(&self, line: &str) -> EnrichOutcome {
        if line.starts_with('#') {
            return EnrichOutcome::Skip(SkipReason::Comment);
        }
        let line = line.trim();
        if line.is_empty() {
            return EnrichOutcome::Skip(SkipReason::Blank);
        }

        let Some(user_agent) = line.split('\t').nth(USER_AGENT_COLUMN) else {
            let found = line.split('\t').count();
            return EnrichOutcome::Skip(SkipReason::MissingColumns { found });
        };

        match self.classifier.classify(user_agent) {
            Ok(agent) => EnrichOutcome::Record(EnrichedRecord::new(line, &agent, &self.source)),
            Err(err) => EnrichOutcome::Skip(SkipReason::Unclassifiable(err)),
        }
    }
}

impl fmt::Debug for Enricher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enricher")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
