//! Trigger and cancel commands

use anyhow::{Result, bail};
use jobdeck_core::domain::job::JobId;
use jobdeck_monitor::{ActionError, PendingAction, Resolution, Session};
use tracing::warn;

use crate::config::Config;
use crate::id_resolver::resolve_job_id;
use crate::render;

pub async fn handle_trigger(config: &Config, job: &str, wait: bool) -> Result<()> {
    let session = config.open_session()?;
    let job_id = resolve_job_id(session.registry(), job)?;

    let result = session.trigger(job_id).await;
    println!("{}", render::describe_action_result(job_id, &result));

    settle(&session, job_id, result, wait).await
}

pub async fn handle_cancel(config: &Config, job: &str, wait: bool) -> Result<()> {
    let session = config.open_session()?;
    let job_id = resolve_job_id(session.registry(), job)?;

    // The run to cancel is taken from a fresh snapshot
    let Some(snapshot) = session.refresh_job(job_id).await else {
        bail!("A refresh of job {} is already in progress", job_id);
    };
    if let Some(error) = &snapshot.fetch_error {
        bail!("Failed to read runs of job {}: {}", job_id, error);
    }

    let result = session.cancel(job_id).await;
    println!("{}", render::describe_action_result(job_id, &result));

    settle(&session, job_id, result, wait).await
}

/// Turns the action outcome into the exit status, optionally waiting for
/// a poll to confirm it
async fn settle(
    session: &Session,
    job_id: JobId,
    result: Result<PendingAction, ActionError>,
    wait: bool,
) -> Result<()> {
    let action = result?;
    if let Some(error) = action.result_error {
        return Err(error.into());
    }

    if wait {
        wait_for_confirmation(session, job_id).await?;
    }
    Ok(())
}

async fn wait_for_confirmation(session: &Session, job_id: JobId) -> Result<()> {
    let settings = session.settings();
    // Coalesced polls do not reach reconciliation, so bound the polls as well
    let max_polls = settings.max_reconcile_attempts.saturating_mul(3);

    for _ in 0..max_polls {
        tokio::time::sleep(settings.repoll_delay).await;

        let Some(snapshot) = session.refresh_job(job_id).await else {
            continue;
        };
        if let Some(error) = &snapshot.fetch_error {
            if !error.is_transient() {
                bail!("Failed to poll job {}: {}", job_id, error);
            }
            warn!("Poll of job {} failed: {}", job_id, error);
            continue;
        }
        if session.pending(job_id).is_some() {
            continue;
        }

        let Some(notice) = session.notice(job_id) else {
            return Ok(());
        };
        println!("{}", render::describe_notice(&notice));
        if notice.resolution != Resolution::Confirmed {
            bail!("Could not confirm the action on job {}", job_id);
        }
        if let Some(run) = snapshot.latest_run() {
            println!(
                "Latest run {} is {}",
                run.run_id,
                render::colorize_state(run.state)
            );
        }
        return Ok(());
    }

    bail!("Gave up waiting for job {} after {} polls", job_id, max_polls)
}
