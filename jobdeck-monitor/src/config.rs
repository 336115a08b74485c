//! Dashboard configuration
//!
//! Two sources feed a session:
//! - the dashboard file (YAML): the monitored job list plus optional
//!   dashboard settings
//! - the process environment: the workspace URL and access token
//!
//! Every problem found here is a [`ConfigError`], which is fatal at startup.

use chrono_tz::Tz;
use jobdeck_core::domain::job::JobId;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::registry::JobRegistry;

/// Lower bound of the auto-refresh interval, in seconds
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 10;
/// Upper bound of the auto-refresh interval, in seconds
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 300;
/// Number of runs kept per job snapshot
pub const MAX_RUN_HISTORY: usize = 10;

pub const HOST_ENV: &str = "DATABRICKS_HOST";
pub const TOKEN_ENV: &str = "DATABRICKS_TOKEN";

/// Configuration errors, all fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("No jobs configured")]
    NoJobs,

    #[error("Invalid job_id {0}: must be a positive integer")]
    InvalidJobId(String),

    #[error("Duplicate job_id {0}")]
    DuplicateJobId(JobId),

    #[error("Missing required secret {0}")]
    MissingSecret(&'static str),

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Clamps an interval request into the supported range
pub fn clamp_interval_secs(secs: i64) -> u64 {
    secs.clamp(
        MIN_REFRESH_INTERVAL_SECS as i64,
        MAX_REFRESH_INTERVAL_SECS as i64,
    ) as u64
}

// =============================================================================
// Dashboard file
// =============================================================================

/// One entry of the `jobs` list
///
/// `job_id` is kept as a raw YAML value so that a non-integer id is reported
/// as an invalid id instead of a generic parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEntry {
    pub job_id: serde_yaml::Value,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Optional `dashboard` section of the file
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardSection {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: i64,
    #[serde(default)]
    pub auto_refresh: bool,
    #[serde(default = "default_run_history_limit")]
    pub run_history_limit: usize,
    #[serde(default = "default_display_timezone")]
    pub display_timezone: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_reconcile_attempts")]
    pub max_reconcile_attempts: u32,
    #[serde(default = "default_repoll_delay")]
    pub repoll_delay_secs: u64,
}

fn default_refresh_interval() -> i64 { 30 }
fn default_run_history_limit() -> usize { MAX_RUN_HISTORY }
fn default_display_timezone() -> String { "America/New_York".to_string() }
fn default_request_timeout() -> u64 { 30 }
fn default_max_reconcile_attempts() -> u32 { 5 }
fn default_repoll_delay() -> u64 { 2 }

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            auto_refresh: false,
            run_history_limit: default_run_history_limit(),
            display_timezone: default_display_timezone(),
            request_timeout_secs: default_request_timeout(),
            max_reconcile_attempts: default_max_reconcile_attempts(),
            repoll_delay_secs: default_repoll_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DashboardFile {
    jobs: Option<Vec<JobEntry>>,
    #[serde(default)]
    dashboard: DashboardSection,
}

/// Validated dashboard settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Auto-refresh interval, already clamped
    pub refresh_interval: Duration,
    pub auto_refresh: bool,
    pub run_history_limit: usize,
    pub display_timezone: Tz,
    /// Deadline applied to every remote call
    pub request_timeout: Duration,
    pub max_reconcile_attempts: u32,
    /// Delay before the extra poll that follows a trigger or cancel
    pub repoll_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(default_refresh_interval() as u64),
            auto_refresh: false,
            run_history_limit: MAX_RUN_HISTORY,
            display_timezone: chrono_tz::America::New_York,
            request_timeout: Duration::from_secs(default_request_timeout()),
            max_reconcile_attempts: default_max_reconcile_attempts(),
            repoll_delay: Duration::from_secs(default_repoll_delay()),
        }
    }
}

impl TryFrom<DashboardSection> for Settings {
    type Error = ConfigError;

    fn try_from(section: DashboardSection) -> Result<Self, Self::Error> {
        if section.run_history_limit == 0 || section.run_history_limit > MAX_RUN_HISTORY {
            return Err(ConfigError::InvalidSetting {
                name: "run_history_limit",
                reason: format!("must be between 1 and {}", MAX_RUN_HISTORY),
            });
        }

        let display_timezone: Tz = section.display_timezone.parse().map_err(|_| {
            ConfigError::InvalidSetting {
                name: "display_timezone",
                reason: format!("unknown timezone {:?}", section.display_timezone),
            }
        })?;

        if section.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "request_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }

        if section.max_reconcile_attempts == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "max_reconcile_attempts",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            refresh_interval: Duration::from_secs(clamp_interval_secs(
                section.refresh_interval_secs,
            )),
            auto_refresh: section.auto_refresh,
            run_history_limit: section.run_history_limit,
            display_timezone,
            request_timeout: Duration::from_secs(section.request_timeout_secs),
            max_reconcile_attempts: section.max_reconcile_attempts,
            repoll_delay: Duration::from_secs(section.repoll_delay_secs),
        })
    }
}

/// Everything the dashboard file provides
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub registry: JobRegistry,
    pub settings: Settings,
}

impl DashboardConfig {
    /// Load the dashboard configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::Missing(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse the dashboard configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let file: DashboardFile =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let entries = file.jobs.ok_or(ConfigError::NoJobs)?;
        let registry = JobRegistry::from_entries(entries)?;
        let settings = Settings::try_from(file.dashboard)?;

        Ok(Self { registry, settings })
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// Workspace connection secrets
#[derive(Clone)]
pub struct Secrets {
    pub host: String,
    pub token: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    /// Builds secrets from optional values, rejecting absent or blank ones
    pub fn new(host: Option<String>, token: Option<String>) -> Result<Self, ConfigError> {
        let host = non_blank(host).ok_or(ConfigError::MissingSecret(HOST_ENV))?;
        let token = non_blank(token).ok_or(ConfigError::MissingSecret(TOKEN_ENV))?;

        if !host.starts_with("http://") && !host.starts_with("https://") {
            return Err(ConfigError::InvalidSetting {
                name: HOST_ENV,
                reason: "must start with http:// or https://".to_string(),
            });
        }

        Ok(Self { host, token })
    }

    /// Reads `DATABRICKS_HOST` and `DATABRICKS_TOKEN` from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(std::env::var(HOST_ENV).ok(), std::env::var(TOKEN_ENV).ok())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
