//! Dashboard view model
//!
//! Plain data built from session state on every render. The presentation
//! layer only formats what is here; it never reads the cache directly.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use jobdeck_core::domain::job::{JobDescriptor, JobId};
use jobdeck_core::domain::run::{RunId, RunRecord, RunState};
use std::time::Duration;

use crate::cache::JobSnapshot;
use crate::coordinator::{ActionNotice, PendingAction};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub summary: Summary,
    pub cards: Vec<JobCard>,
}

impl DashboardView {
    pub fn card(&self, job_id: JobId) -> Option<&JobCard> {
        self.cards.iter().find(|card| card.job_id == job_id)
    }
}

/// Header shown above the cards
#[derive(Debug, Clone)]
pub struct Summary {
    pub jobs_monitored: usize,
    pub timezone: Tz,
    pub auto_refresh: bool,
    pub interval: Duration,
    pub polling: bool,
    pub last_refresh: Option<String>,
    pub next_refresh_in: Option<Duration>,
}

/// One card per registered job
#[derive(Debug, Clone)]
pub struct JobCard {
    pub job_id: JobId,
    pub title: String,
    pub latest_state: Option<RunState>,
    pub history: Vec<RunRow>,
    /// False while an action on this job is in flight
    pub can_trigger: bool,
    /// Only when the latest run is running
    pub can_cancel: bool,
    /// Whether a fetch ever succeeded for this job
    pub loaded: bool,
    pub fetch_error: Option<String>,
    pub pending: Option<PendingAction>,
    pub notice: Option<ActionNotice>,
}

impl JobCard {
    pub fn build(
        job: &JobDescriptor,
        snapshot: Option<&JobSnapshot>,
        pending: Option<PendingAction>,
        notice: Option<ActionNotice>,
        timezone: Tz,
    ) -> Self {
        let remote_name = snapshot.and_then(|s| s.job_name.as_deref());
        let latest = snapshot.and_then(JobSnapshot::latest_run);
        let action_in_flight = pending.as_ref().is_some_and(|action| !action.is_terminal());

        Self {
            job_id: job.job_id,
            title: job.title(remote_name),
            latest_state: latest.map(|run| run.state),
            history: snapshot
                .map(|s| s.runs.iter().map(|run| RunRow::build(run, timezone)).collect())
                .unwrap_or_default(),
            can_trigger: !action_in_flight,
            can_cancel: !action_in_flight && latest.is_some_and(RunRecord::is_running),
            loaded: snapshot.is_some_and(|s| s.fetched_at.is_some()),
            fetch_error: snapshot
                .and_then(|s| s.fetch_error.as_ref())
                .map(ToString::to_string),
            pending,
            notice,
        }
    }

    /// Cached runs are shown but the last fetch failed
    pub fn is_stale(&self) -> bool {
        self.loaded && self.fetch_error.is_some()
    }
}

/// One row of a card's run history, already formatted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRow {
    pub run_id: RunId,
    pub state: RunState,
    pub started: String,
    pub ended: String,
    pub duration: String,
    pub url: Option<String>,
}

impl RunRow {
    pub fn build(run: &RunRecord, timezone: Tz) -> Self {
        let (ended, duration) = match run.ended_at {
            Some(ended) => (
                format_timestamp(ended, timezone),
                run.duration_seconds
                    .map(format_duration)
                    .unwrap_or_else(|| "-".to_string()),
            ),
            None if run.state.is_terminal() => ("-".to_string(), "-".to_string()),
            None => ("Running".to_string(), "In Progress".to_string()),
        };

        Self {
            run_id: run.run_id,
            state: run.state,
            started: format_timestamp(run.started_at, timezone),
            ended,
            duration,
            url: run.run_page_url.clone(),
        }
    }
}

pub fn format_timestamp(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone).format(TIMESTAMP_FORMAT).to_string()
}

/// `45s`, `2m 5s`, `1h 3m`
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, total % 3600 / 60, total % 60);

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
