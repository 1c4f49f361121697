mod config;
mod telemetry;

use clap::{Args, Parser};
use config::{Config, ConfigError};
use gateway::config::ValidationError;
use gateway::errors::GatewayError;
use std::path::PathBuf;
use telemetry::TelemetryError;

#[derive(Parser)]
#[command(name = "pncp", about = "Gateway for the public procurement (PNCP) API")]
enum CliCommand {
    /// Run the gateway
    Gateway(ConfigArgs),
    /// Check a config file and exit
    ValidateConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, short, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() -> Result<(), CliError> {
    let cli = CliCommand::parse();

    match cli {
        CliCommand::Gateway(args) => {
            let config = Config::from_file(&args.config)?;
            let _sentry = telemetry::init_logging(config.common.logging.as_ref());
            telemetry::init_metrics(config.common.metrics.as_ref())?;

            tracing::info!(config = %args.config.display(), "Starting gateway");
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(gateway::run(config.gateway))?;
        }
        CliCommand::ValidateConfig(args) => {
            let config = Config::from_file(&args.config)?;
            config.gateway.validate()?;
            println!("{}: ok", args.config.display());
        }
    }

    Ok(())
}
