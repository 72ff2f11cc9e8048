use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use burstbook::commands;
use burstbook::config::{Config, Credentials};

#[derive(Parser)]
#[command(
    name = "burstbook",
    version,
    about = "Books a quota-limited event the moment its reservation window opens",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file (defaults to BURSTBOOK_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Account email (or BURSTBOOK_EMAIL); the password is read from BURSTBOOK_PASSWORD
    #[arg(short, long, global = true)]
    email: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for the target event, wait for it to open and book it
    Run,

    /// List this month's events with their selector scores
    List,

    /// Detect the booking endpoint using the given event id
    Probe {
        /// Event id sent in probe payloads
        event_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate().context("Invalid configuration")?;

    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(log_format, &config.logging.level, cli.verbose)?;

    tracing::info!(base_url = %config.site.base_url, "burstbook starting");

    let credentials = Credentials::from_env(cli.email, None)?;

    match cli.command {
        Commands::Run => {
            tracing::info!(
                keywords = ?config.target.keywords,
                shots = config.burst.parallel_shots,
                "Starting run command"
            );
            commands::run(config, credentials).await?;
        }

        Commands::List => {
            tracing::info!("Starting list command");
            commands::list(config, credentials).await?;
        }

        Commands::Probe { event_id } => {
            tracing::info!(event_id = %event_id, "Starting probe command");
            commands::probe(config, credentials, event_id).await?;
        }
    }

    tracing::info!("burstbook finished");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("burstbook=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("burstbook={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
