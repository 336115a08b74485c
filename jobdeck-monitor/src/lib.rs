//! Jobdeck Monitor
//!
//! Session-scoped dashboard state for a fixed set of remote jobs.
//!
//! Architecture:
//! - Configuration: dashboard file and secrets, validated at startup
//! - Registry: the monitored jobs, read-only after load
//! - Cache: last fetched run history per job, stale-but-shown on errors
//! - Coordinator: trigger/cancel actions and their reconciliation
//! - Scheduler: the refresh loop, manual or timed
//! - Session/View: per-user wiring and the render model

pub mod cache;
pub mod config;
pub mod coordinator;
mod deadline;
pub mod events;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod view;

#[cfg(test)]
mod testing;

pub use cache::{JobSnapshot, StatusCache};
pub use config::{ConfigError, DashboardConfig, Secrets, Settings};
pub use coordinator::{
    ActionCoordinator, ActionError, ActionKind, ActionNotice, ActionStatus, PendingAction,
    ReconcileOutcome, Resolution,
};
pub use events::SessionEvent;
pub use registry::JobRegistry;
pub use scheduler::{AutoRefresh, LoopState, PollReport, RefreshLoop};
pub use session::Session;
pub use view::{DashboardView, JobCard, RunRow, Summary};
