//! Refresh loop
//!
//! `IDLE -> POLLING -> IDLE`, entered manually through [`RefreshLoop::refresh_now`]
//! or by the timer task started with [`RefreshLoop::run`]. A request that
//! arrives while a cycle is running is dropped: the running cycle satisfies it.

use chrono::{DateTime, Utc};
use jobdeck_client::JobApi;
use jobdeck_core::domain::job::JobId;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info};

use crate::cache::StatusCache;
use crate::config::{Settings, clamp_interval_secs};
use crate::coordinator::{ActionCoordinator, ReconcileOutcome};
use crate::events::{EventSender, SessionEvent, publish};
use crate::registry::JobRegistry;

/// Timer settings, changed at any time from the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoRefresh {
    pub enabled: bool,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Polling,
}

/// Summary of one POLLING cycle
#[derive(Debug, Clone)]
pub struct PollReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Jobs whose snapshot was replaced
    pub refreshed: usize,
    /// Jobs whose fetch failed this cycle
    pub failed: Vec<JobId>,
    /// Reconcile results for jobs that had an action
    pub outcomes: Vec<(JobId, ReconcileOutcome)>,
}

impl PollReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Clears the polling flag when a cycle ends, even if it is cancelled
struct PollingGuard<'a>(&'a AtomicBool);

impl Drop for PollingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RefreshLoop {
    registry: Arc<JobRegistry>,
    cache: Arc<StatusCache>,
    coordinator: Arc<ActionCoordinator>,
    client: Arc<dyn JobApi>,
    events: EventSender,
    polling: AtomicBool,
    auto: watch::Sender<AutoRefresh>,
    last_poll: Mutex<Option<(Instant, DateTime<Utc>)>>,
    repoll_delay: Duration,
}

impl RefreshLoop {
    pub fn new(
        registry: Arc<JobRegistry>,
        cache: Arc<StatusCache>,
        coordinator: Arc<ActionCoordinator>,
        client: Arc<dyn JobApi>,
        settings: &Settings,
        events: EventSender,
    ) -> Self {
        let (auto, _) = watch::channel(AutoRefresh {
            enabled: settings.auto_refresh,
            interval: settings.refresh_interval,
        });

        Self {
            registry,
            cache,
            coordinator,
            client,
            events,
            polling: AtomicBool::new(false),
            auto,
            last_poll: Mutex::new(None),
            repoll_delay: settings.repoll_delay,
        }
    }

    pub fn state(&self) -> LoopState {
        if self.polling.load(Ordering::Acquire) {
            LoopState::Polling
        } else {
            LoopState::Idle
        }
    }

    fn last_poll(&self) -> MutexGuard<'_, Option<(Instant, DateTime<Utc>)>> {
        self.last_poll.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wall-clock start of the most recent cycle
    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.last_poll().map(|(_, at)| at)
    }

    // =============================================================================
    // Timer settings
    // =============================================================================

    pub fn auto_refresh(&self) -> AutoRefresh {
        *self.auto.borrow()
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        self.auto.send_if_modified(|auto| {
            let changed = auto.enabled != enabled;
            auto.enabled = enabled;
            changed
        });
        info!("Auto-refresh {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Sets the timer interval, clamped to the allowed range
    pub fn set_interval(&self, secs: i64) -> Duration {
        let interval = Duration::from_secs(clamp_interval_secs(secs));
        self.auto.send_if_modified(|auto| {
            let changed = auto.interval != interval;
            auto.interval = interval;
            changed
        });
        info!("Refresh interval set to {:?}", interval);
        interval
    }

    /// Time until the timer fires, when auto-refresh is on
    pub fn next_refresh_in(&self) -> Option<Duration> {
        let auto = self.auto_refresh();
        if !auto.enabled {
            return None;
        }
        Some(match *self.last_poll() {
            Some((started, _)) => (started + auto.interval).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        })
    }

    // =============================================================================
    // Polling
    // =============================================================================

    /// Runs one POLLING cycle
    ///
    /// Returns `None` without touching the remote API when a cycle is already
    /// running.
    pub async fn refresh_now(&self) -> Option<PollReport> {
        let _guard = self.enter_polling()?;

        let started_at = Utc::now();
        *self.last_poll() = Some((Instant::now(), started_at));
        let job_ids = self.registry.ids();
        debug!("Polling {} job(s)", job_ids.len());

        Some(self.poll(&job_ids, started_at).await)
    }

    /// Polls a single job under the same POLLING guard
    ///
    /// Dropped like [`RefreshLoop::refresh_now`] while a cycle is running.
    /// The timer schedule is left alone.
    pub async fn refresh_job(&self, job_id: JobId) -> Option<PollReport> {
        let _guard = self.enter_polling()?;
        debug!("Polling job {}", job_id);

        Some(self.poll(&[job_id], Utc::now()).await)
    }

    fn enter_polling(&self) -> Option<PollingGuard<'_>> {
        if self
            .polling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Poll already in progress, dropping refresh request");
            return None;
        }
        Some(PollingGuard(&self.polling))
    }

    /// Fetches the jobs, reconciles their actions and publishes the report
    async fn poll(&self, job_ids: &[JobId], started_at: DateTime<Utc>) -> PollReport {
        publish(&self.events, SessionEvent::PollStarted);

        let snapshots = self
            .cache
            .refresh_all(job_ids, Arc::clone(&self.client))
            .await;

        let mut failed = Vec::new();
        let mut outcomes = Vec::new();
        for snapshot in &snapshots {
            if snapshot.fetch_error.is_some() {
                failed.push(snapshot.job_id);
            }
            match self.coordinator.reconcile(snapshot.job_id, snapshot) {
                ReconcileOutcome::Idle => {}
                outcome => outcomes.push((snapshot.job_id, outcome)),
            }
        }

        let report = PollReport {
            started_at,
            finished_at: Utc::now(),
            refreshed: snapshots.len() - failed.len(),
            failed,
            outcomes,
        };
        info!(
            "Poll complete: {} refreshed, {} failed",
            report.refreshed,
            report.failed.len()
        );
        publish(&self.events, SessionEvent::PollCompleted(report.clone()));

        report
    }

    /// Timer task: polls when the interval elapses and shortly after every
    /// submitted action, until `shutdown` flips to `true`
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut auto = self.auto.subscribe();
        let repoll = self.coordinator.repoll_signal();
        let mut repoll_at: Option<Instant> = None;

        let interval = auto.borrow().interval;
        info!("Starting refresh loop (interval: {:?})", interval);

        loop {
            let settings = *auto.borrow_and_update();
            let deadline = if settings.enabled {
                Some(match *self.last_poll() {
                    Some((started, _)) => started + settings.interval,
                    None => Instant::now(),
                })
            } else {
                None
            };

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                changed = auto.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    debug!("Auto-refresh settings changed");
                }
                _ = repoll.notified() => {
                    let at = Instant::now() + self.repoll_delay;
                    repoll_at = Some(repoll_at.map_or(at, |pending| pending.min(at)));
                    debug!("Accelerated re-poll in {:?}", self.repoll_delay);
                }
                _ = sleep_until(repoll_at) => {
                    repoll_at = None;
                    self.refresh_now().await;
                }
                _ = sleep_until(deadline) => {
                    self.refresh_now().await;
                }
            }
        }

        info!("Refresh loop stopped");
    }
}

/// Sleeps until `deadline`, or forever when there is none
fn sleep_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(deadline) => time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
