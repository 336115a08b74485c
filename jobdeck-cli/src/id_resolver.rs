//! Job selector resolution
//!
//! Lets users name a monitored job by id or by its configured display name.

use anyhow::{Result, anyhow};
use jobdeck_core::domain::job::JobId;
use jobdeck_monitor::JobRegistry;

/// Resolve a job id or display name against the registry
///
/// # Errors
/// Returns an error listing the known jobs if nothing matches. Only jobs in
/// the dashboard file can be acted on.
pub fn resolve_job_id(registry: &JobRegistry, selector: &str) -> Result<JobId> {
    if let Some(job) = registry.find(selector) {
        return Ok(job.job_id);
    }

    let known: Vec<String> = registry
        .jobs()
        .iter()
        .map(|job| match &job.display_name {
            Some(name) => format!("{} ({})", job.job_id, name),
            None => job.job_id.to_string(),
        })
        .collect();

    Err(anyhow!(
        "No monitored job matches '{}'. Known jobs: {}",
        selector.trim(),
        known.join(", ")
    ))
}

/// Resolve an optional selector, as used by `--job` filters
pub fn resolve_filter(registry: &JobRegistry, selector: Option<&str>) -> Result<Option<JobId>> {
    selector
        .map(|selector| resolve_job_id(registry, selector))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobdeck_monitor::DashboardConfig;

    fn registry() -> JobRegistry {
        DashboardConfig::from_yaml_str(
            "jobs:\n  - job_id: 111\n    display_name: Nightly ETL\n  - job_id: 222\n",
        )
        .unwrap()
        .registry
    }

    #[test]
    fn test_resolves_id_and_name() {
        let registry = registry();
        assert_eq!(resolve_job_id(&registry, "222").unwrap(), 222);
        assert_eq!(resolve_job_id(&registry, " nightly etl ").unwrap(), 111);
    }

    #[test]
    fn test_unknown_selector_lists_known_jobs() {
        let err = resolve_job_id(&registry(), "333").unwrap_err().to_string();
        assert!(err.contains("'333'"));
        assert!(err.contains("111 (Nightly ETL)"));
        assert!(err.contains("222"));
    }

    #[test]
    fn test_filter_is_optional() {
        assert_eq!(resolve_filter(&registry(), None).unwrap(), None);
        assert_eq!(resolve_filter(&registry(), Some("111")).unwrap(), Some(111));
    }
}
