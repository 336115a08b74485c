//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod action;
mod jobs;
mod status;
mod watch;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Poll every monitored job once and show the dashboard
    Status {
        /// Only show this job (id or display name)
        #[arg(long)]
        job: Option<String>,
    },
    /// Live dashboard with auto-refresh and keyboard actions
    Watch {
        /// Refresh interval in seconds (clamped to 10..=300)
        #[arg(long, allow_negative_numbers = true)]
        interval: Option<i64>,

        /// Start with auto-refresh turned off
        #[arg(long)]
        no_auto: bool,

        /// Only show this job (id or display name)
        #[arg(long)]
        job: Option<String>,
    },
    /// Start a new run of a monitored job
    Trigger {
        /// Job id or display name
        job: String,

        /// Wait until the new run shows up
        #[arg(short, long)]
        wait: bool,
    },
    /// Cancel the running run of a monitored job
    Cancel {
        /// Job id or display name
        job: String,

        /// Wait until the run is no longer running
        #[arg(short, long)]
        wait: bool,
    },
    /// List every job in the workspace
    Jobs,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Status { job } => status::handle_status(config, job.as_deref()).await,
        Commands::Watch {
            interval,
            no_auto,
            job,
        } => watch::handle_watch(config, interval, no_auto, job.as_deref()).await,
        Commands::Trigger { job, wait } => action::handle_trigger(config, &job, wait).await,
        Commands::Cancel { job, wait } => action::handle_cancel(config, &job, wait).await,
        Commands::Jobs => jobs::handle_jobs(config).await,
    }
}
