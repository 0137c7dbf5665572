//! Per-object processing shared by the Lambda and the replay CLI
//!
//! Fetches one stored CloudFront log object, enriches every line and hands
//! the records to the delivery client in bounded batches.

pub mod error;
pub mod init;
pub mod processor;
pub mod source;

pub use error::PipelineError;
pub use init::{build_processor, init_tracing, load_aws_config, log_startup, AwsClients};
pub use processor::{LogProcessor, ProcessingResult, SkipCounts};
pub use source::{FetchError, ObjectSource, OpenDalSource, S3ObjectSource};
