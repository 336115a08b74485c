//! Job registry
//!
//! The static list of monitored jobs, loaded once per session. Read-only
//! after load.

use jobdeck_core::domain::job::{JobDescriptor, JobId};
use std::collections::HashSet;
use std::path::Path;

use crate::config::{ConfigError, DashboardConfig, JobEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRegistry {
    jobs: Vec<JobDescriptor>,
}

impl JobRegistry {
    /// Loads the job list from a dashboard file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        DashboardConfig::load(path).map(|config| config.registry)
    }

    /// Validates raw entries: ids must be positive integers and unique
    pub fn from_entries(entries: Vec<JobEntry>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::NoJobs);
        }

        let mut seen = HashSet::new();
        let mut jobs = Vec::with_capacity(entries.len());

        for entry in entries {
            let job_id = parse_job_id(&entry.job_id)?;
            if !seen.insert(job_id) {
                return Err(ConfigError::DuplicateJobId(job_id));
            }

            let display_name = entry
                .display_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty());
            jobs.push(JobDescriptor::new(job_id, display_name));
        }

        Ok(Self { jobs })
    }

    pub fn jobs(&self) -> &[JobDescriptor] {
        &self.jobs
    }

    /// Job ids in configuration order
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|job| job.job_id).collect()
    }

    pub fn get(&self, job_id: JobId) -> Option<&JobDescriptor> {
        self.jobs.iter().find(|job| job.job_id == job_id)
    }

    /// Finds a job by id or by its configured display name (case-insensitive)
    pub fn find(&self, selector: &str) -> Option<&JobDescriptor> {
        let selector = selector.trim();
        if let Ok(job_id) = selector.parse::<JobId>() {
            if let Some(job) = self.get(job_id) {
                return Some(job);
            }
        }
        self.jobs.iter().find(|job| {
            job.display_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(selector))
        })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn parse_job_id(value: &serde_yaml::Value) -> Result<JobId, ConfigError> {
    match value.as_i64() {
        Some(id) if id > 0 => Ok(id),
        _ => {
            let rendered = serde_yaml::to_string(value)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| format!("{:?}", value));
            Err(ConfigError::InvalidJobId(rendered))
        }
    }
}
