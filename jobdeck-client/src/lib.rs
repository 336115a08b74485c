//! Jobdeck HTTP Client
//!
//! A small, type-safe client for the remote Jobs 2.1 REST API.
//!
//! The monitor depends only on the [`JobApi`] trait so that the polling and
//! action logic can be exercised against scripted fakes; [`JobsClient`] is
//! the HTTP implementation used by the binary.
//!
//! # Example
//!
//! ```no_run
//! use jobdeck_client::{JobApi, JobsClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jobdeck_client::ClientError> {
//!     let client = JobsClient::new(
//!         "https://workspace.example.cloud",
//!         "dapi-token",
//!         Duration::from_secs(30),
//!     )?;
//!
//!     let runs = client.list_runs_for_job(111, 10).await?;
//!     println!("Job 111 has {} recent run(s)", runs.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod runs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use async_trait::async_trait;
use jobdeck_core::domain::job::{JobId, JobMeta};
use jobdeck_core::domain::run::{RunId, RunRecord};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Capability set the monitor consumes from the remote job service
///
/// Every method may fail with `NotFound`, `Auth`, `Network` or `Timeout`.
/// `trigger_run` may additionally fail with `Validation` and `cancel_run`
/// with `AlreadyTerminal`.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Lists the most recent runs of a job, at most `limit` of them
    async fn list_runs_for_job(&self, job_id: JobId, limit: usize) -> Result<Vec<RunRecord>>;

    /// Fetches job metadata (the remote job name)
    async fn get_job_meta(&self, job_id: JobId) -> Result<JobMeta>;

    /// Starts a new run and returns its id
    async fn trigger_run(&self, job_id: JobId) -> Result<RunId>;

    /// Requests cancellation of a run
    async fn cancel_run(&self, run_id: RunId) -> Result<()>;
}

/// HTTP client for the remote Jobs API
///
/// Endpoints are grouped by resource:
/// - Jobs: metadata lookup and workspace listing
/// - Runs: history listing, run-now and cancel
#[derive(Clone)]
pub struct JobsClient {
    /// Base URL of the workspace (e.g., "https://adb-123.azuredatabricks.net")
    base_url: String,
    /// Personal access token sent as a bearer token
    token: String,
    /// HTTP client instance
    client: Client,
}

impl std::fmt::Debug for JobsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobsClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl JobsClient {
    /// Create a new client with a per-request timeout
    ///
    /// # Arguments
    /// * `base_url` - The workspace URL
    /// * `token` - The access token
    /// * `timeout` - Upper bound for every request, connect included
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, token, client))
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, token: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    /// Get the base URL of the workspace
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/2.1/jobs/{}", self.base_url, path)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Non-success statuses are mapped onto the error taxonomy using the
    /// status code and the API's `error_code`.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_status(status.as_u16(), &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is ignored
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_status(status.as_u16(), &error_text));
        }

        Ok(())
    }
}

#[async_trait]
impl JobApi for JobsClient {
    async fn list_runs_for_job(&self, job_id: JobId, limit: usize) -> Result<Vec<RunRecord>> {
        self.list_runs(job_id, limit).await
    }

    async fn get_job_meta(&self, job_id: JobId) -> Result<JobMeta> {
        self.get_job(job_id).await
    }

    async fn trigger_run(&self, job_id: JobId) -> Result<RunId> {
        self.run_now(job_id).await
    }

    async fn cancel_run(&self, run_id: RunId) -> Result<()> {
        self.cancel(run_id).await
    }
}
