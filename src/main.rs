//! Main entry point for the ModernMT connector CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modernmt_connector::cli::commands::{self, Commands};
use modernmt_connector::ProviderConfig;

/// ModernMT Connector - translate content jobs with ModernMT
#[derive(Parser, Debug)]
#[command(name = "modernmt-connector", version, about, long_about = None)]
struct Args {
    /// Provider configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Key id of the ModernMT API key (overrides configuration)
    #[arg(long)]
    api_key_id: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}={}", env!("CARGO_CRATE_NAME"), log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = ProviderConfig::load(args.config.as_deref())?;
    if let Some(api_key_id) = args.api_key_id {
        config = config.override_api_key_id(api_key_id);
    }

    // Execute command
    match args.command {
        Some(Commands::Check) => {
            commands::handle_check(config).await?;
        }
        Some(Commands::Translate { job, output }) => {
            commands::handle_translate(config, job, output).await?;
        }
        Some(Commands::Config) => {
            commands::handle_config(config).await?;
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
