//! Terminal rendering of the dashboard view model

use colored::*;
use jobdeck_core::domain::job::JobId;
use jobdeck_core::domain::run::RunState;
use jobdeck_monitor::{
    ActionError, ActionNotice, ActionStatus, DashboardView, JobCard, PendingAction, PollReport,
    Resolution, RunRow, Summary,
};
use std::time::Duration;

/// Clears the terminal and moves the cursor home
pub fn clear_screen() {
    print!("\x1B[2J\x1B[H");
}

pub fn print_dashboard(view: &DashboardView) {
    print_summary(&view.summary);

    if view.cards.is_empty() {
        println!("{}", "No jobs to show.".yellow());
        return;
    }

    for card in &view.cards {
        print_card(card);
    }
}

fn print_summary(summary: &Summary) {
    println!("{}", "Job Monitor".bold());
    println!(
        "  Jobs: {}   Timezone: {}   Auto-refresh: {}",
        summary.jobs_monitored,
        summary.timezone.name(),
        if summary.auto_refresh {
            format!("every {}s", summary.interval.as_secs()).green()
        } else {
            "off".dimmed()
        }
    );

    let last = summary
        .last_refresh
        .clone()
        .unwrap_or_else(|| "never".to_string());
    match (summary.polling, summary.next_refresh_in) {
        (true, _) => println!("  Last refresh: {}   {}", last.dimmed(), "refreshing...".cyan()),
        (false, Some(next)) => println!(
            "  Last refresh: {}   Next in {}",
            last.dimmed(),
            format_wait(next)
        ),
        (false, None) => println!("  Last refresh: {}", last.dimmed()),
    }
    println!("{}", "─".repeat(80).dimmed());
}

fn print_card(card: &JobCard) {
    let state = match card.latest_state {
        Some(state) => colorize_state(state),
        None if card.loaded => "NO RUNS".dimmed(),
        None => "UNKNOWN".dimmed(),
    };

    println!(
        "{} {} {}  {}",
        "▸".cyan(),
        card.title.bold(),
        format!("[{}]", card.job_id).dimmed(),
        state
    );

    if let Some(error) = &card.fetch_error {
        let label = if card.is_stale() { "stale" } else { "error" };
        println!("    {} {}", format!("{}:", label).red(), error.red());
    }

    if let Some(action) = &card.pending {
        println!("    {}", describe_pending(action).yellow());
    } else if let Some(notice) = &card.notice {
        println!("    {}", describe_notice(notice));
    }

    let mut controls = Vec::new();
    if card.can_trigger {
        controls.push(format!("t {}", card.job_id));
    }
    if card.can_cancel {
        controls.push(format!("c {}", card.job_id));
    }
    if !controls.is_empty() {
        println!("    {} {}", "actions:".dimmed(), controls.join("  ").dimmed());
    }

    if !card.history.is_empty() {
        println!(
            "    {}",
            format!(
                "{:<14} {:<10} {:<20} {:<20} {:<12} {}",
                "RUN", "STATE", "STARTED", "ENDED", "DURATION", "LINK"
            )
            .dimmed()
        );
        for row in &card.history {
            print_run_row(row);
        }
    }
    println!();
}

fn print_run_row(row: &RunRow) {
    // Pad before colouring so escape codes do not break the alignment
    let state = colorize_state_padded(row.state, 10);
    println!(
        "    {:<14} {} {:<20} {:<20} {:<12} {}",
        row.run_id,
        state,
        row.started,
        row.ended,
        row.duration,
        row.url.as_deref().unwrap_or("-").dimmed()
    );
}

/// Colorize run state for display
pub fn colorize_state(state: RunState) -> ColoredString {
    paint(state, state.to_string())
}

fn colorize_state_padded(state: RunState, width: usize) -> ColoredString {
    paint(state, format!("{:<width$}", state.to_string(), width = width))
}

fn paint(state: RunState, text: String) -> ColoredString {
    match state {
        RunState::Pending => text.yellow(),
        RunState::Running => text.blue(),
        RunState::Success => text.green(),
        RunState::Failed => text.red(),
        RunState::Canceled => text.magenta(),
        RunState::Timeout => text.bright_magenta(),
        RunState::Error => text.bright_red(),
    }
}

pub fn describe_pending(action: &PendingAction) -> String {
    match action.status {
        ActionStatus::InFlight => format!("{} in progress...", action.kind),
        ActionStatus::Submitted => match action.result_run_id.or(action.target_run_id) {
            Some(run_id) => format!(
                "{} submitted (run {}), waiting for confirmation",
                action.kind, run_id
            ),
            None => format!("{} submitted, waiting for confirmation", action.kind),
        },
        ActionStatus::Failed => format!(
            "{} failed: {}",
            action.kind,
            action
                .result_error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
        ),
    }
}

pub fn describe_notice(notice: &ActionNotice) -> ColoredString {
    let action = &notice.action;
    match notice.resolution {
        Resolution::Confirmed => format!("✓ {} confirmed", action.kind).green(),
        Resolution::Failed => format!(
            "✗ {} failed: {}",
            action.kind,
            action
                .result_error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
        )
        .red(),
        Resolution::Unconfirmed => format!("⚠ {} result unconfirmed", action.kind).yellow(),
    }
}

/// One-line outcome of a trigger/cancel gesture
pub fn describe_action_result(job_id: JobId, result: &Result<PendingAction, ActionError>) -> ColoredString {
    match result {
        Ok(action) if action.status == ActionStatus::Failed => {
            format!("Job {}: {}", job_id, describe_pending(action)).red()
        }
        Ok(action) => format!("Job {}: {}", job_id, describe_pending(action)).green(),
        Err(e) => format!("Job {}: {}", job_id, e).red(),
    }
}

pub fn describe_poll(report: &PollReport) -> ColoredString {
    let text = format!(
        "Refreshed {} job(s) in {}ms",
        report.refreshed,
        (report.finished_at - report.started_at).num_milliseconds()
    );
    if report.is_clean() {
        text.dimmed()
    } else {
        format!("{}, {} failed", text, report.failed.len()).yellow()
    }
}

pub fn print_legend() {
    println!(
        "  {}  {}  {}  {}  {}  {}  {}",
        colorize_state(RunState::Pending),
        colorize_state(RunState::Running),
        colorize_state(RunState::Success),
        colorize_state(RunState::Failed),
        colorize_state(RunState::Canceled),
        colorize_state(RunState::Timeout),
        colorize_state(RunState::Error)
    );
}

fn format_wait(wait: Duration) -> String {
    format!("{}s", wait.as_secs())
}
