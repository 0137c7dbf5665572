// AWS Lambda runtime adapter
//
// Handles S3 object-created notifications for CloudFront standard logs:
// every object named in the event is fetched from S3, enriched and sent to
// the configured Firehose delivery stream.
//
// lambda_runtime provides tokio; clients are built once per cold start and
// reused across invocations.

use std::sync::Arc;

use aws_lambda_events::event::s3::S3Event;
use cloudfront2firehose_config::RuntimeConfig;
use cloudfront2firehose_delivery::RecordSink;
use cloudfront2firehose_handlers::{
    init_tracing, load_aws_config, log_startup, AwsClients, ObjectSource, S3ObjectSource,
};
use lambda_runtime::{service_fn, Error, LambdaEvent};

mod handlers;
mod response;

pub use handlers::{decode_object_key, handle_s3_event};
pub use response::{InvocationSummary, SourceOutcome, SourceSummary};

/// Version string baked in at build time
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Resolves the object source for a bucket named in an event record.
pub trait BucketSources: Send + Sync {
    fn for_bucket(&self, bucket: &str) -> Arc<dyn ObjectSource>;
}

/// Buckets read through the shared S3 client
struct S3Buckets(AwsClients);

impl BucketSources for S3Buckets {
    fn for_bucket(&self, bucket: &str) -> Arc<dyn ObjectSource> {
        Arc::new(S3ObjectSource::new(self.0.s3.clone(), bucket))
    }
}

/// Everything an invocation needs, shared across invocations
#[derive(Clone)]
pub struct LambdaState {
    pub config: Arc<RuntimeConfig>,
    pub buckets: Arc<dyn BucketSources>,
    pub sink: Arc<dyn RecordSink>,
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    let config = RuntimeConfig::load()
        .map_err(|e| Error::from(format!("Failed to load configuration: {:#}", e)))?;
    init_tracing(&config.logging);
    log_startup(&config, VERSION);
    tracing::info!(build_timestamp = env!("BUILD_TIMESTAMP"), "Lambda runtime ready");

    let sdk_config = load_aws_config(config.source.region.as_deref()).await;
    let clients = AwsClients::new(&sdk_config);
    let sink: Arc<dyn RecordSink> = Arc::new(clients.firehose.clone());

    let state = LambdaState {
        config: Arc::new(config),
        buckets: Arc::new(S3Buckets(clients)),
        sink,
    };

    lambda_runtime::run(service_fn(move |event: LambdaEvent<S3Event>| {
        let state = state.clone();
        async move {
            let (payload, _context) = event.into_parts();
            handle_s3_event(payload, &state).await
        }
    }))
    .await
}
