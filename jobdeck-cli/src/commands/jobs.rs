//! Workspace job listing
//!
//! Lists every job the token can see, to help fill in the dashboard file.

use anyhow::{Context, Result};
use colored::*;
use jobdeck_core::domain::job::WorkspaceJob;

use crate::config::Config;

pub async fn handle_jobs(config: &Config) -> Result<()> {
    // The dashboard file is optional here: only the timeout is taken from it
    let settings = config
        .dashboard()
        .map(|dashboard| dashboard.settings)
        .unwrap_or_default();
    let client = config.client(&settings)?;

    println!("{}", format!("Connecting to {}...", client.base_url()).dimmed());
    let jobs = client
        .list_workspace_jobs()
        .await
        .context("Failed to list workspace jobs")?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
        return Ok(());
    }

    println!("{}", "═".repeat(100).dimmed());
    println!(
        "{}",
        format!("{:<15} | {:<60} | {:<20}", "Job ID", "Job Name", "Creator").bold()
    );
    println!("{}", "═".repeat(100).dimmed());
    for job in &jobs {
        print_job_row(job);
    }
    println!("{}", "═".repeat(100).dimmed());
    println!("\nTotal jobs found: {}", jobs.len().to_string().bold());

    println!("\nTo monitor a job, add its ID to {}:", config.config_path.display());
    println!(
        "{}",
        "jobs:\n  - job_id: YOUR_JOB_ID_HERE\n    display_name: \"Your Job Name\"".cyan()
    );

    Ok(())
}

fn print_job_row(job: &WorkspaceJob) {
    println!(
        "{:<15} | {:<60} | {:<20}",
        job.job_id,
        job.name,
        job.creator.as_deref().unwrap_or("Unknown")
    );
}
