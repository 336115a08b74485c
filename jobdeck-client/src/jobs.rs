//! Job-related API endpoints

use crate::JobsClient;
use crate::error::Result;
use jobdeck_core::domain::job::{JobId, JobMeta, WorkspaceJob};
use jobdeck_core::dto::job::{JobResponse, ListJobsResponse};
use tracing::debug;

/// Page size used when listing workspace jobs
const LIST_JOBS_PAGE_SIZE: usize = 100;

impl JobsClient {
    /// Get a job's metadata by ID
    ///
    /// # Arguments
    /// * `job_id` - The job ID
    ///
    /// # Returns
    /// The job name and creator
    pub async fn get_job(&self, job_id: JobId) -> Result<JobMeta> {
        let response = self
            .client
            .get(self.url("get"))
            .bearer_auth(&self.token)
            .query(&[("job_id", job_id)])
            .send()
            .await?;

        let job: JobResponse = self.handle_response(response).await?;
        Ok(job.into())
    }

    /// List every job defined in the workspace
    ///
    /// Follows `next_page_token` until the API reports no more pages.
    pub async fn list_workspace_jobs(&self) -> Result<Vec<WorkspaceJob>> {
        let mut jobs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.url("list"))
                .bearer_auth(&self.token)
                .query(&[("limit", LIST_JOBS_PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("page_token", token)]);
            }

            let page: ListJobsResponse = self.handle_response(request.send().await?).await?;
            debug!("Fetched {} workspace job(s)", page.jobs.len());
            jobs.extend(page.jobs.into_iter().map(WorkspaceJob::from));

            match page.next_page_token {
                Some(token) if page.has_more => page_token = Some(token),
                _ => break,
            }
        }

        Ok(jobs)
    }
}
