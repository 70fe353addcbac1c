//! devilbox: health checks and tooling for a Devilbox installation.
//!
//! # Usage
//!
//! ```text
//! devilbox --root ~/devilbox health --format json
//! devilbox services
//! devilbox serve --port 8080
//! devilbox tools            # JSON-RPC tool server on stdio
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use devilbox_core::DevilboxConfig;
use devilbox_core::config::parse_duration;

mod commands;

#[derive(Parser)]
#[command(
    name = "devilbox",
    about = "Devilbox service health, dashboard, and tool server",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Devilbox project root (holds .env and docker-compose.yml)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Per-probe timeout, e.g. 500ms, 2s. Overrides DEVILBOX_PROBE_TIMEOUT.
    #[arg(long, global = true, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every service and print the health score.
    ///
    /// Exits with status 1 when any check fails.
    Health {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show which auxiliary services (search, mail, broker, S3) are running
    Services {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Serve the health dashboard over HTTP
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,
    },
    /// Run the JSON-RPC tool server on stdin/stdout
    Tools,
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    parse_duration(raw).ok_or_else(|| format!("invalid duration {raw:?} (try 500ms or 2s)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Stdout belongs to command output and the tool protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("warn,devilbox_dashboard=info")
            }),
        )
        .init();

    let cli = Cli::parse();

    let mut config = DevilboxConfig::load(&cli.root)
        .with_context(|| format!("loading configuration from {}", cli.root.display()))?;
    if let Some(timeout) = cli.timeout {
        config = config.with_probe_timeout(timeout);
    }

    match cli.command {
        Commands::Health { format } => commands::health::health(&config, &format).await,
        Commands::Services { format } => {
            commands::health::services(&config, &format).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { port, bind } => {
            commands::serve::serve(config, bind, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Tools => {
            commands::tools::tools(config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
