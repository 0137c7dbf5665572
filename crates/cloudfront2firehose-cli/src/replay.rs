// Replay stored log objects through the pipeline
//
// Locations run one after another. Ctrl-C or SIGTERM cancels the token the
// processors share; the source in flight stops at its next batch or backoff.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cloudfront2firehose_config::RuntimeConfig;
use cloudfront2firehose_delivery::RecordSink;
use cloudfront2firehose_handlers::{
    build_processor, init_tracing, load_aws_config, log_startup, AwsClients, ObjectSource,
    OpenDalSource, S3ObjectSource,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::location::Location;

pub async fn run(config: RuntimeConfig, dir: PathBuf, locations: Vec<Location>) -> Result<()> {
    init_tracing(&config.logging);
    log_startup(&config, env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            warn!("Shutdown requested; cancelling replay");
            shutdown.cancel();
        }
    });

    let sdk_config = load_aws_config(config.source.region.as_deref()).await;
    let clients = AwsClients::new(&sdk_config);
    let sink: Arc<dyn RecordSink> = Arc::new(clients.firehose.clone());

    let local = if locations.iter().any(|l| matches!(l, Location::Local { .. })) {
        Some(local_source(&dir)?)
    } else {
        None
    };

    let mut failed = Vec::new();
    for location in &locations {
        if shutdown.is_cancelled() {
            warn!(location = %location, "Skipping location after shutdown");
            failed.push(location.to_string());
            continue;
        }

        let source: Arc<dyn ObjectSource> = match location {
            Location::S3 { bucket, .. } => {
                Arc::new(S3ObjectSource::new(clients.s3.clone(), bucket.as_str()))
            }
            Location::Local { .. } => local.clone().context("log directory was not opened")?,
        };

        let processor =
            build_processor(&config, source, sink.clone()).with_cancellation(shutdown.clone());

        match processor.process(location.key()).await {
            Ok(result) => {
                println!("{}", serde_json::to_string(&result)?);
            }
            Err(err) => {
                error!(
                    location = %location,
                    error_type = err.error_type(),
                    error = %err,
                    "Failed to replay log object"
                );
                failed.push(location.to_string());
            }
        }
    }

    if !failed.is_empty() {
        bail!(
            "{} of {} log objects failed: {}",
            failed.len(),
            locations.len(),
            failed.join(", ")
        );
    }

    info!(sources = locations.len(), "Replay complete");
    Ok(())
}

fn local_source(dir: &Path) -> Result<Arc<dyn ObjectSource>> {
    let root = dir
        .canonicalize()
        .with_context(|| format!("Cannot open log directory {}", dir.display()))?;
    let source = OpenDalSource::new_fs(&root.to_string_lossy())
        .with_context(|| format!("Cannot open log directory {}", root.display()))?;
    Ok(Arc::new(source))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
