//! Run DTOs for the remote Jobs API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::JobId;
use crate::domain::run::{RunId, RunRecord, RunState};

/// Response of `GET /api/2.1/jobs/runs/list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRunsResponse {
    #[serde(default)]
    pub runs: Vec<RunDto>,
    #[serde(default)]
    pub has_more: bool,
}

/// A run as reported by the remote API
///
/// Timestamps are epoch milliseconds; a zero `start_time` means the run has
/// not started yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDto {
    pub run_id: RunId,
    pub job_id: JobId,
    #[serde(default)]
    pub state: RunStateDto,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub run_duration: Option<i64>,
    #[serde(default)]
    pub run_page_url: Option<String>,
}

/// Remote run state: a life-cycle state plus a result once terminated
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStateDto {
    #[serde(default)]
    pub life_cycle_state: Option<LifeCycleState>,
    #[serde(default)]
    pub result_state: Option<ResultState>,
    #[serde(default)]
    pub state_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifeCycleState {
    Queued,
    Pending,
    Blocked,
    WaitingForRetry,
    Running,
    Terminating,
    Terminated,
    Skipped,
    InternalError,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultState {
    Success,
    Failed,
    Canceled,
    Timedout,
    #[serde(other)]
    Other,
}

/// Request body of `POST /api/2.1/jobs/runs/cancel`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRunRequest {
    pub run_id: RunId,
}

impl RunStateDto {
    /// Collapses the remote state pair into the dashboard's closed state set
    pub fn to_run_state(&self) -> RunState {
        let from_result = |result: Option<ResultState>| match result {
            Some(ResultState::Success) => RunState::Success,
            Some(ResultState::Failed) => RunState::Failed,
            Some(ResultState::Canceled) => RunState::Canceled,
            Some(ResultState::Timedout) => RunState::Timeout,
            Some(ResultState::Other) | None => RunState::Error,
        };

        match self.life_cycle_state {
            Some(
                LifeCycleState::Queued
                | LifeCycleState::Pending
                | LifeCycleState::Blocked
                | LifeCycleState::WaitingForRetry,
            ) => RunState::Pending,
            Some(LifeCycleState::Running) => RunState::Running,
            Some(LifeCycleState::Terminating) if self.result_state.is_none() => RunState::Running,
            Some(LifeCycleState::Terminating | LifeCycleState::Terminated) => {
                from_result(self.result_state)
            }
            Some(LifeCycleState::Skipped) => RunState::Canceled,
            Some(LifeCycleState::InternalError | LifeCycleState::Unknown) | None => {
                RunState::Error
            }
        }
    }
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

impl From<RunDto> for RunRecord {
    fn from(dto: RunDto) -> Self {
        let started_at = dto
            .start_time
            .filter(|ms| *ms > 0)
            .and_then(from_millis)
            .unwrap_or(DateTime::UNIX_EPOCH);
        let ended_at = dto.end_time.filter(|ms| *ms > 0).and_then(from_millis);

        let duration_seconds = ended_at.map(|end| {
            dto.run_duration
                .filter(|ms| *ms > 0)
                .map(|ms| ms as f64 / 1000.0)
                .unwrap_or_else(|| {
                    (end - started_at).num_milliseconds().max(0) as f64 / 1000.0
                })
        });

        Self {
            run_id: dto.run_id,
            job_id: dto.job_id,
            state: dto.state.to_run_state(),
            started_at,
            ended_at,
            duration_seconds,
            run_page_url: dto.run_page_url,
        }
    }
}
