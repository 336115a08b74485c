//! Run-related API endpoints

use crate::JobsClient;
use crate::error::Result;
use jobdeck_core::domain::job::JobId;
use jobdeck_core::domain::run::{RunId, RunRecord};
use jobdeck_core::dto::job::{RunNowRequest, RunNowResponse};
use jobdeck_core::dto::run::{CancelRunRequest, ListRunsResponse};

/// Largest page the runs endpoint accepts
const MAX_RUNS_LIMIT: usize = 25;

impl JobsClient {
    // =============================================================================
    // Run History
    // =============================================================================

    /// List the most recent runs of a job
    ///
    /// # Arguments
    /// * `job_id` - The job ID
    /// * `limit` - Maximum number of runs, capped at the API's page size
    ///
    /// # Returns
    /// The runs as reported by the API, newest first
    pub async fn list_runs(&self, job_id: JobId, limit: usize) -> Result<Vec<RunRecord>> {
        let limit = limit.clamp(1, MAX_RUNS_LIMIT);
        let response = self
            .client
            .get(self.url("runs/list"))
            .bearer_auth(&self.token)
            .query(&[("job_id", job_id.to_string()), ("limit", limit.to_string())])
            .send()
            .await?;

        let page: ListRunsResponse = self.handle_response(response).await?;
        Ok(page.runs.into_iter().map(RunRecord::from).collect())
    }

    // =============================================================================
    // Run Actions
    // =============================================================================

    /// Trigger a new run of a job
    ///
    /// # Returns
    /// The ID of the created run
    pub async fn run_now(&self, job_id: JobId) -> Result<RunId> {
        let response = self
            .client
            .post(self.url("run-now"))
            .bearer_auth(&self.token)
            .json(&RunNowRequest { job_id })
            .send()
            .await?;

        let created: RunNowResponse = self.handle_response(response).await?;
        Ok(created.run_id)
    }

    /// Cancel a run
    ///
    /// Cancellation is asynchronous on the remote side: the run moves through
    /// a terminating state before it reports `CANCELED`.
    pub async fn cancel(&self, run_id: RunId) -> Result<()> {
        let response = self
            .client
            .post(self.url("runs/cancel"))
            .bearer_auth(&self.token)
            .json(&CancelRunRequest { run_id })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
