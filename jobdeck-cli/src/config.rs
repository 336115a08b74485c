//! Configuration module
//!
//! Turns command-line options into a connected dashboard session.

use anyhow::{Context, Result};
use jobdeck_client::JobsClient;
use jobdeck_monitor::{DashboardConfig, Secrets, Session, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the dashboard file
    pub config_path: PathBuf,
    /// Workspace URL, from `--host` or the environment
    pub host: Option<String>,
    /// Access token, from `--token` or the environment
    pub token: Option<String>,
}

impl Config {
    pub fn secrets(&self) -> Result<Secrets> {
        Ok(Secrets::new(self.host.clone(), self.token.clone())?)
    }

    /// HTTP client for the workspace, bounded by the configured timeout
    pub fn client(&self, settings: &Settings) -> Result<JobsClient> {
        let secrets = self.secrets()?;
        debug!("Connecting to {}", secrets.host);
        JobsClient::new(secrets.host, secrets.token, settings.request_timeout)
            .context("Failed to build HTTP client")
    }

    pub fn dashboard(&self) -> Result<DashboardConfig> {
        DashboardConfig::load(&self.config_path).with_context(|| {
            format!(
                "Invalid dashboard configuration in {}",
                self.config_path.display()
            )
        })
    }

    /// Loads the dashboard file and secrets and opens a session
    ///
    /// Any configuration problem is reported here, before the first poll.
    pub fn open_session(&self) -> Result<Session> {
        let dashboard = self.dashboard()?;
        let client = self.client(&dashboard.settings)?;
        Ok(Session::from_config(dashboard, Arc::new(client)))
    }
}
