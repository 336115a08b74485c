//! Job DTOs for the remote Jobs API

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobId, JobMeta, WorkspaceJob};
use crate::domain::run::RunId;

/// Response of `GET /api/2.1/jobs/get`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub job_id: JobId,
    #[serde(default)]
    pub creator_user_name: Option<String>,
    #[serde(default)]
    pub settings: JobSettings,
}

/// The subset of job settings the dashboard reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default)]
    pub name: Option<String>,
}

impl From<JobResponse> for JobMeta {
    fn from(job: JobResponse) -> Self {
        Self {
            job_id: job.job_id,
            name: job
                .settings
                .name
                .unwrap_or_else(|| format!("Job {}", job.job_id)),
            creator: job.creator_user_name,
        }
    }
}

impl From<JobResponse> for WorkspaceJob {
    fn from(job: JobResponse) -> Self {
        let meta = JobMeta::from(job);
        Self {
            job_id: meta.job_id,
            name: meta.name,
            creator: meta.creator,
        }
    }
}

/// Response of `GET /api/2.1/jobs/list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsResponse {
    #[serde(default)]
    pub jobs: Vec<JobResponse>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Request body of `POST /api/2.1/jobs/run-now`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunNowRequest {
    pub job_id: JobId,
}

/// Response of `POST /api/2.1/jobs/run-now`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunNowResponse {
    pub run_id: RunId,
    #[serde(default)]
    pub number_in_job: Option<i64>,
}

/// Error body returned by the remote API on non-2xx responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
