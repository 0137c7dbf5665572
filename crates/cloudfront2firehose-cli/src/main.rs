use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cloudfront2firehose_config::RuntimeConfig;
use std::path::PathBuf;

mod location;
mod replay;

use location::Location;

/// Replay stored CloudFront standard logs into a Firehose delivery stream
#[derive(Parser, Debug)]
#[command(name = "cloudfront2firehose")]
#[command(version)]
#[command(about = "Enrich CloudFront standard logs with user-agent fields and send them to Kinesis Data Firehose", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. info or cloudfront2firehose_handlers=debug
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline for already stored log objects
    Replay {
        /// Delivery stream name (overrides config)
        #[arg(short, long, value_name = "NAME")]
        stream: Option<String>,

        /// Directory that local locations are relative to
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// s3://bucket/key or a path under --dir
        #[arg(value_name = "LOCATION", required = true)]
        locations: Vec<Location>,
    },
    /// Print the resolved configuration as TOML
    CheckConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli)?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    match cli.command {
        Commands::Replay {
            stream,
            dir,
            locations,
        } => {
            if let Some(stream) = stream {
                config.delivery.stream_name = stream;
            }
            config.validate().context("Invalid configuration")?;

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?
                .block_on(replay::run(config, dir, locations))
        }
        Commands::CheckConfig => {
            config.validate().context("Invalid configuration")?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<RuntimeConfig> {
    match &cli.config {
        Some(path) => RuntimeConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => RuntimeConfig::load_or_default().context("Failed to load configuration"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_replay_arguments() {
        let cli = Cli::try_parse_from([
            "cloudfront2firehose",
            "replay",
            "--stream",
            "cf-enriched",
            "--dir",
            "/var/log/cloudfront",
            "s3://cf-logs/E1.2024-01-15-14.a.gz",
            "E1.2024-01-15-15.b.gz",
        ])
        .unwrap();

        match cli.command {
            Commands::Replay {
                stream,
                dir,
                locations,
            } => {
                assert_eq!(stream.as_deref(), Some("cf-enriched"));
                assert_eq!(dir, PathBuf::from("/var/log/cloudfront"));
                assert_eq!(locations.len(), 2);
                assert!(matches!(locations[0], Location::S3 { .. }));
                assert!(matches!(locations[1], Location::Local { .. }));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn replay_requires_a_location() {
        assert!(Cli::try_parse_from(["cloudfront2firehose", "replay"]).is_err());
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli =
            Cli::try_parse_from(["cloudfront2firehose", "check-config", "--config", "cf.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cf.toml")));
        assert!(matches!(cli.command, Commands::CheckConfig));
    }
}
