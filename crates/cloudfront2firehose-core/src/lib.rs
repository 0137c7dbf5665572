//! Core CloudFront access-log processing
//!
//! Pure building blocks shared by every runtime: decompression and line
//! splitting, user-agent enrichment of individual log lines, and batching of
//! enriched records under the delivery stream's per-call limits.
//!
//! Nothing in this crate performs I/O or awaits; fetching the source object
//! and delivering batches live in the handlers and delivery crates.

pub mod batch;
pub mod classify;
pub mod codec;
pub mod enrich;
pub mod error;
pub mod record;

pub use batch::{Batch, BatchLimits, Batcher, Batches, MAX_BATCH_BYTES, MAX_BATCH_SIZE};
pub use classify::{UserAgentClassifier, UserAgentInfo, WootheeClassifier};
pub use codec::{decompress, lines, Compression};
pub use enrich::{EnrichOutcome, Enricher, SkipReason};
pub use error::{ClassifyError, DecodeError};
pub use record::{EnrichedRecord, SourceIdentity, MIN_COLUMNS, USER_AGENT_COLUMN};
