//! Run domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::job::JobId;

/// Identifier of a single run of a job
pub type RunId = i64;

/// One execution instance of a job
///
/// Produced only by the remote client and treated as read-only. Caches
/// replace whole records on refetch, they never edit fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub job_id: JobId,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    /// Link to the run in the remote workspace UI, when reported
    pub run_page_url: Option<String>,
}

impl RunRecord {
    /// Ordering used for "latest run": newest `started_at` first, ties broken
    /// by the higher run id.
    pub fn newest_first(a: &RunRecord, b: &RunRecord) -> Ordering {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| b.run_id.cmp(&a.run_id))
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }
}

/// Sorts runs newest-first and keeps at most `limit` of them
pub fn newest_runs(mut runs: Vec<RunRecord>, limit: usize) -> Vec<RunRecord> {
    runs.sort_by(RunRecord::newest_first);
    runs.truncate(limit);
    runs
}

/// Run state, a closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    Timeout,
    Error,
}

impl RunState {
    /// Whether the run has reached a final state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Pending | RunState::Running)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunState::Pending => "PENDING",
            RunState::Running => "RUNNING",
            RunState::Success => "SUCCESS",
            RunState::Failed => "FAILED",
            RunState::Canceled => "CANCELED",
            RunState::Timeout => "TIMEOUT",
            RunState::Error => "ERROR",
        };
        f.write_str(label)
    }
}
