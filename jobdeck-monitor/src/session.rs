//! Dashboard session
//!
//! Owns the registry, cache, coordinator and refresh loop of one user. Two
//! sessions never share state.

use jobdeck_client::JobApi;
use jobdeck_core::domain::job::JobId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{JobSnapshot, StatusCache};
use crate::config::{DashboardConfig, Settings};
use crate::coordinator::{ActionCoordinator, ActionError, ActionNotice, PendingAction};
use crate::events::{EVENT_CHANNEL_CAPACITY, EventSender, SessionEvent};
use crate::registry::JobRegistry;
use crate::scheduler::{AutoRefresh, PollReport, RefreshLoop};
use crate::view::{DashboardView, JobCard, Summary, format_timestamp};

pub struct Session {
    registry: Arc<JobRegistry>,
    settings: Settings,
    cache: Arc<StatusCache>,
    coordinator: Arc<ActionCoordinator>,
    refresh: Arc<RefreshLoop>,
    client: Arc<dyn JobApi>,
    events: EventSender,
    shutdown: watch::Sender<bool>,
}

impl Session {
    pub fn new(registry: JobRegistry, settings: Settings, client: Arc<dyn JobApi>) -> Self {
        let registry = Arc::new(registry);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, _) = watch::channel(false);

        let cache = Arc::new(StatusCache::new(
            settings.run_history_limit,
            settings.request_timeout,
        ));
        let coordinator = Arc::new(
            ActionCoordinator::new(
                Arc::clone(&cache),
                settings.request_timeout,
                settings.max_reconcile_attempts,
            )
            .with_events(events.clone()),
        );
        let refresh = Arc::new(RefreshLoop::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            Arc::clone(&coordinator),
            Arc::clone(&client),
            &settings,
            events.clone(),
        ));

        Self {
            registry,
            settings,
            cache,
            coordinator,
            refresh,
            client,
            events,
            shutdown,
        }
    }

    pub fn from_config(config: DashboardConfig, client: Arc<dyn JobApi>) -> Self {
        Self::new(config.registry, config.settings, client)
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn snapshot(&self, job_id: JobId) -> Option<JobSnapshot> {
        self.cache.get(job_id)
    }

    pub fn pending(&self, job_id: JobId) -> Option<PendingAction> {
        self.coordinator.pending(job_id)
    }

    pub fn notice(&self, job_id: JobId) -> Option<ActionNotice> {
        self.coordinator.notice(job_id)
    }

    /// State-change signal for the presentation layer
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn refresh_now(&self) -> Option<PollReport> {
        self.refresh.refresh_now().await
    }

    /// Refreshes a single job without a full cycle and reconciles it
    ///
    /// `None` when a poll was already running; the cache then holds whatever
    /// that poll stored.
    pub async fn refresh_job(&self, job_id: JobId) -> Option<JobSnapshot> {
        self.refresh.refresh_job(job_id).await?;
        self.cache.get(job_id)
    }

    pub async fn trigger(&self, job_id: JobId) -> Result<PendingAction, ActionError> {
        self.coordinator.trigger(job_id, self.client.as_ref()).await
    }

    pub async fn cancel(&self, job_id: JobId) -> Result<PendingAction, ActionError> {
        self.coordinator.cancel(job_id, self.client.as_ref()).await
    }

    pub fn auto_refresh(&self) -> AutoRefresh {
        self.refresh.auto_refresh()
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        self.refresh.set_auto_refresh(enabled);
    }

    pub fn set_interval(&self, secs: i64) -> Duration {
        self.refresh.set_interval(secs)
    }

    /// Spawns the timer task; it runs until [`Session::shutdown`]
    pub fn start_auto_refresh(&self) -> JoinHandle<()> {
        let _ = self.shutdown.send_replace(false);
        tokio::spawn(Arc::clone(&self.refresh).run(self.shutdown.subscribe()))
    }

    pub fn shutdown(&self) {
        info!("Shutting down session");
        let _ = self.shutdown.send_replace(true);
    }

    /// Builds the view model, optionally restricted to one job
    pub fn view(&self, only: Option<JobId>) -> DashboardView {
        let timezone = self.settings.display_timezone;
        let auto = self.refresh.auto_refresh();

        let cards = self
            .registry
            .jobs()
            .iter()
            .filter(|job| only.is_none_or(|job_id| job.job_id == job_id))
            .map(|job| {
                JobCard::build(
                    job,
                    self.cache.get(job.job_id).as_ref(),
                    self.coordinator.pending(job.job_id),
                    self.coordinator.notice(job.job_id),
                    timezone,
                )
            })
            .collect();

        DashboardView {
            summary: Summary {
                jobs_monitored: self.registry.len(),
                timezone,
                auto_refresh: auto.enabled,
                interval: auto.interval,
                polling: self.refresh.state() == crate::scheduler::LoopState::Polling,
                last_refresh: self
                    .refresh
                    .last_refreshed_at()
                    .map(|at| format_timestamp(at, timezone)),
                next_refresh_in: self.refresh.next_refresh_in(),
            },
            cards,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.shutdown.send_replace(true);
    }
}
