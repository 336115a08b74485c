//! Jobdeck CLI
//!
//! Terminal dashboard for a fixed set of remote jobs: shows their latest
//! runs, triggers new runs and cancels running ones.

mod commands;
mod config;
mod id_resolver;
mod render;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "jobdeck")]
#[command(about = "Monitor, trigger and cancel remote job runs", long_about = None)]
struct Cli {
    /// Dashboard file listing the monitored jobs
    #[arg(long, env = "JOBDECK_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Workspace URL
    #[arg(long, env = "DATABRICKS_HOST")]
    host: Option<String>,

    /// Workspace access token
    #[arg(long, env = "DATABRICKS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr and stay quiet by default so they do not break the dashboard
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobdeck=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        config_path: cli.config,
        host: cli.host,
        token: cli.token,
    };

    handle_command(cli.command, &config).await
}
