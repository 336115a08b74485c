//! Job domain types

use serde::{Deserialize, Serialize};

/// Identifier of a job in the remote workspace
pub type JobId = i64;

/// A monitored job, as listed in the dashboard configuration
///
/// Immutable once loaded; owned by the job registry for the session lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: JobId,
    /// Name shown on the card. Falls back to the remote job name when absent.
    pub display_name: Option<String>,
}

impl JobDescriptor {
    pub fn new(job_id: JobId, display_name: Option<String>) -> Self {
        Self {
            job_id,
            display_name,
        }
    }

    /// Resolves the card title from the configured name, the remote name, or the id
    pub fn title(&self, remote_name: Option<&str>) -> String {
        self.display_name
            .as_deref()
            .or(remote_name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Job {}", self.job_id))
    }
}

/// Job metadata reported by the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMeta {
    pub job_id: JobId,
    pub name: String,
    pub creator: Option<String>,
}

/// Summary of a job defined in the remote workspace
///
/// Used when listing every job to help fill in the dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceJob {
    pub job_id: JobId,
    pub name: String,
    pub creator: Option<String>,
}
