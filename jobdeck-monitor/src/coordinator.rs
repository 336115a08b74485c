//! Action coordinator
//!
//! Runs trigger and cancel requests against the remote API and tracks each
//! one as a [`PendingAction`] until a later poll shows its effect.
//!
//! Lifecycle of an action:
//! - `InFlight`: the remote call has not returned; blocks further actions on
//!   the same job
//! - `Submitted` / `Failed`: the remote call returned; the action waits for a
//!   poll issued after it to confirm (or, when failed, to clear) it
//!
//! The coordinator never writes to the status cache. It only reads snapshots
//! (to pick the run to cancel) and asks the refresh loop for an early poll.

use chrono::{DateTime, Utc};
use jobdeck_client::{ClientError, JobApi};
use jobdeck_core::domain::job::JobId;
use jobdeck_core::domain::run::RunId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{JobSnapshot, StatusCache};
use crate::deadline::bounded;
use crate::events::{EventSender, SessionEvent, publish};

/// Errors surfaced to the user for an action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Another action on the same job has not returned yet
    #[error("An action for job {job_id} is already in progress")]
    Conflict { job_id: JobId },

    /// Cancel requested but the latest run is not running
    #[error("Job {job_id} has no running run to cancel")]
    NoActiveRun { job_id: JobId },

    /// The remote call failed
    #[error(transparent)]
    Remote(#[from] ClientError),

    /// No poll confirmed the action within the allowed number of cycles
    #[error("Action result unconfirmed after {attempts} poll(s)")]
    ReconcileTimeout { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Trigger,
    Cancel,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Trigger => write!(f, "trigger"),
            ActionKind::Cancel => write!(f, "cancel"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// Remote call outstanding
    InFlight,
    /// Remote call succeeded, effect not yet observed
    Submitted,
    /// Remote call failed
    Failed,
}

/// A user-issued action awaiting confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub id: Uuid,
    pub job_id: JobId,
    pub kind: ActionKind,
    pub issued_at: DateTime<Utc>,
    pub status: ActionStatus,
    /// Run targeted by a cancel
    pub target_run_id: Option<RunId>,
    /// Run created by a trigger
    pub result_run_id: Option<RunId>,
    pub result_error: Option<ActionError>,
    /// Polls issued after the action that did not confirm it
    pub reconcile_attempts: u32,
}

impl PendingAction {
    fn new(job_id: JobId, kind: ActionKind, target_run_id: Option<RunId>, issued_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            kind,
            issued_at,
            status: ActionStatus::InFlight,
            target_run_id,
            result_run_id: None,
            result_error: None,
            reconcile_attempts: 0,
        }
    }

    /// Whether the remote call has returned
    pub fn is_terminal(&self) -> bool {
        self.status != ActionStatus::InFlight
    }

    /// Whether the snapshot shows the action's effect
    fn is_reflected_in(&self, snapshot: &JobSnapshot) -> bool {
        match self.kind {
            ActionKind::Trigger => self
                .result_run_id
                .is_some_and(|run_id| snapshot.run(run_id).is_some()),
            // A target that dropped out of the history window is no longer running either.
            ActionKind::Cancel => self.target_run_id.is_some_and(|run_id| {
                snapshot.run(run_id).is_none_or(|run| !run.is_running())
            }),
        }
    }
}

/// Result of reconciling one job after a poll
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// No action exists for the job
    Idle,
    /// The poll cannot judge the action: the remote call is outstanding or
    /// the poll was issued before the action
    NotEligible,
    /// The action is still waiting for its effect
    Pending { attempts: u32 },
    /// The effect was observed; the action is cleared
    Confirmed(PendingAction),
    /// The remote call had failed; the action is cleared
    Failed(PendingAction),
    /// The bound was exceeded; the action is cleared with `ReconcileTimeout`
    Unconfirmed(PendingAction),
}

/// How the last action on a job ended, kept for display
#[derive(Debug, Clone, PartialEq)]
pub struct ActionNotice {
    pub action: PendingAction,
    pub resolution: Resolution,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Confirmed,
    Failed,
    Unconfirmed,
}

#[derive(Default)]
struct Actions {
    pending: HashMap<JobId, PendingAction>,
    notices: HashMap<JobId, ActionNotice>,
}

/// Coordinates trigger/cancel actions for one session
pub struct ActionCoordinator {
    cache: Arc<StatusCache>,
    actions: Mutex<Actions>,
    request_timeout: Duration,
    max_reconcile_attempts: u32,
    repoll: Arc<Notify>,
    events: Option<EventSender>,
}

impl ActionCoordinator {
    pub fn new(cache: Arc<StatusCache>, request_timeout: Duration, max_reconcile_attempts: u32) -> Self {
        Self {
            cache,
            actions: Mutex::new(Actions::default()),
            request_timeout,
            max_reconcile_attempts: max_reconcile_attempts.max(1),
            repoll: Arc::new(Notify::new()),
            events: None,
        }
    }

    /// Publishes `ActionUpdated` events on the given channel
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Signal raised whenever a submitted action wants an early poll
    pub fn repoll_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.repoll)
    }

    fn lock(&self) -> MutexGuard<'_, Actions> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current action for a job, if any
    pub fn pending(&self, job_id: JobId) -> Option<PendingAction> {
        self.lock().pending.get(&job_id).cloned()
    }

    /// Number of actions currently tracked
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// How the most recent cleared action for a job ended
    pub fn notice(&self, job_id: JobId) -> Option<ActionNotice> {
        self.lock().notices.get(&job_id).cloned()
    }

    /// Whether a trigger or cancel may be issued for the job right now
    pub fn can_act(&self, job_id: JobId) -> bool {
        self.lock()
            .pending
            .get(&job_id)
            .is_none_or(PendingAction::is_terminal)
    }

    // =============================================================================
    // Actions
    // =============================================================================

    /// Starts a new run of a job
    ///
    /// Rejected with `Conflict` while another action on the job is in flight.
    /// A failed remote call is recorded on the returned action.
    pub async fn trigger(&self, job_id: JobId, client: &dyn JobApi) -> Result<PendingAction, ActionError> {
        let action = self.begin(job_id, ActionKind::Trigger, None, Utc::now())?;
        info!("Triggering job {}", job_id);

        let result = bounded(self.request_timeout, client.trigger_run(job_id))
            .await
            .map(Some);
        Ok(self.finish(&action, result))
    }

    /// Cancels the running latest run of a job
    ///
    /// Fails with `NoActiveRun`, without any remote call, unless the cached
    /// latest run is `RUNNING`.
    pub async fn cancel(&self, job_id: JobId, client: &dyn JobApi) -> Result<PendingAction, ActionError> {
        let run_id = self
            .cache
            .get(job_id)
            .and_then(|snapshot| snapshot.active_run_id())
            .ok_or_else(|| {
                warn!("Cancel rejected: job {} has no running run", job_id);
                ActionError::NoActiveRun { job_id }
            })?;

        let action = self.begin(job_id, ActionKind::Cancel, Some(run_id), Utc::now())?;
        info!("Canceling run {} of job {}", run_id, job_id);

        let result = bounded(self.request_timeout, client.cancel_run(run_id))
            .await
            .map(|_| None);
        Ok(self.finish(&action, result))
    }

    /// Registers an in-flight action, enforcing one in-flight action per job
    fn begin(
        &self,
        job_id: JobId,
        kind: ActionKind,
        target_run_id: Option<RunId>,
        issued_at: DateTime<Utc>,
    ) -> Result<PendingAction, ActionError> {
        let action = {
            let mut actions = self.lock();
            if let Some(existing) = actions.pending.get(&job_id) {
                if !existing.is_terminal() {
                    warn!("Rejected {} for job {}: {} in flight", kind, job_id, existing.kind);
                    return Err(ActionError::Conflict { job_id });
                }
                debug!(
                    "Replacing unconfirmed {} {} for job {}",
                    existing.kind, existing.id, job_id
                );
            }

            let action = PendingAction::new(job_id, kind, target_run_id, issued_at);
            actions.pending.insert(job_id, action.clone());
            action
        };

        self.announce(job_id);
        Ok(action)
    }

    /// Records the remote call's result on the action
    fn finish(&self, action: &PendingAction, result: Result<Option<RunId>, ClientError>) -> PendingAction {
        let updated = {
            let mut actions = self.lock();
            let entry = actions
                .pending
                .entry(action.job_id)
                .or_insert_with(|| action.clone());

            match result {
                Ok(run_id) => {
                    entry.status = ActionStatus::Submitted;
                    entry.result_run_id = run_id;
                    info!(
                        "{} for job {} submitted{}",
                        entry.kind,
                        entry.job_id,
                        run_id.map(|id| format!(" (run {})", id)).unwrap_or_default()
                    );
                }
                Err(e) => {
                    warn!("{} for job {} failed: {}", entry.kind, entry.job_id, e);
                    entry.status = ActionStatus::Failed;
                    entry.result_error = Some(ActionError::Remote(e));
                }
            }
            entry.clone()
        };

        if updated.status == ActionStatus::Submitted {
            self.repoll.notify_one();
        }
        self.announce(updated.job_id);
        updated
    }

    // =============================================================================
    // Reconciliation
    // =============================================================================

    /// Matches the job's action against a freshly polled snapshot
    ///
    /// Only polls issued after the action count. Each such poll that does not
    /// show the effect, including one that failed, uses up one attempt; when
    /// the attempts run out the action is cleared with `ReconcileTimeout`.
    pub fn reconcile(&self, job_id: JobId, snapshot: &JobSnapshot) -> ReconcileOutcome {
        let outcome = {
            let mut actions = self.lock();
            let Some(action) = actions.pending.get_mut(&job_id) else {
                return ReconcileOutcome::Idle;
            };

            if !action.is_terminal() || snapshot.attempted_at <= action.issued_at {
                return ReconcileOutcome::NotEligible;
            }

            // A failed poll cannot confirm anything but still counts towards the bound.
            let observed = snapshot.fetch_error.is_none();
            let resolution = if action.status == ActionStatus::Failed {
                Resolution::Failed
            } else if observed && action.is_reflected_in(snapshot) {
                Resolution::Confirmed
            } else {
                action.reconcile_attempts += 1;
                if action.reconcile_attempts < self.max_reconcile_attempts {
                    debug!(
                        "{} for job {} not yet reflected ({}/{})",
                        action.kind, job_id, action.reconcile_attempts, self.max_reconcile_attempts
                    );
                    return ReconcileOutcome::Pending {
                        attempts: action.reconcile_attempts,
                    };
                }
                action.result_error = Some(ActionError::ReconcileTimeout {
                    attempts: action.reconcile_attempts,
                });
                Resolution::Unconfirmed
            };

            let Some(cleared) = actions.pending.remove(&job_id) else {
                return ReconcileOutcome::Idle;
            };
            actions.notices.insert(
                job_id,
                ActionNotice {
                    action: cleared.clone(),
                    resolution,
                    resolved_at: Utc::now(),
                },
            );

            match resolution {
                Resolution::Confirmed => {
                    info!("{} for job {} confirmed", cleared.kind, job_id);
                    ReconcileOutcome::Confirmed(cleared)
                }
                Resolution::Failed => ReconcileOutcome::Failed(cleared),
                Resolution::Unconfirmed => {
                    warn!(
                        "{} for job {} unconfirmed after {} poll(s)",
                        cleared.kind, job_id, cleared.reconcile_attempts
                    );
                    ReconcileOutcome::Unconfirmed(cleared)
                }
            }
        };

        self.announce(job_id);
        outcome
    }

    fn announce(&self, job_id: JobId) {
        if let Some(events) = &self.events {
            publish(events, SessionEvent::ActionUpdated(job_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeJobApi, at, run};
    use jobdeck_core::domain::run::RunState;

    fn setup(max_attempts: u32) -> (Arc<StatusCache>, ActionCoordinator) {
        let cache = Arc::new(StatusCache::new(10, Duration::from_secs(5)));
        let coordinator = ActionCoordinator::new(Arc::clone(&cache), Duration::from_secs(5), max_attempts);
        (cache, coordinator)
    }

    fn snapshot(job_id: JobId, fetched: i64, runs: Vec<jobdeck_core::domain::run::RunRecord>) -> JobSnapshot {
        JobSnapshot {
            job_id,
            job_name: None,
            runs,
            fetched_at: Some(at(fetched)),
            attempted_at: at(fetched),
            fetch_error: None,
        }
    }

    /// Inserts a submitted trigger issued at `issued`
    fn submitted_trigger(coordinator: &ActionCoordinator, job_id: JobId, run_id: RunId, issued: i64) {
        let action = coordinator
            .begin(job_id, ActionKind::Trigger, None, at(issued))
            .unwrap();
        coordinator.finish(&action, Ok(Some(run_id)));
    }

    #[tokio::test]
    async fn test_trigger_records_run_id() {
        let (_, coordinator) = setup(5);
        let api = FakeJobApi::new();
        api.push_trigger_result(Ok(2));

        let action = coordinator.trigger(111, &api).await.unwrap();

        assert_eq!(action.status, ActionStatus::Submitted);
        assert_eq!(action.result_run_id, Some(2));
        assert!(action.result_error.is_none());
        assert_eq!(coordinator.pending(111), Some(action));
        assert_eq!(api.trigger_calls(), vec![111]);
    }

    #[tokio::test]
    async fn test_trigger_failure_is_recorded() {
        let (_, coordinator) = setup(5);
        let api = FakeJobApi::new();
        api.push_trigger_result(Err(ClientError::Validation("job is paused".into())));

        let action = coordinator.trigger(111, &api).await.unwrap();

        assert_eq!(action.status, ActionStatus::Failed);
        assert!(action.is_terminal());
        assert_eq!(
            action.result_error,
            Some(ActionError::Remote(ClientError::Validation("job is paused".into())))
        );
    }

    #[tokio::test]
    async fn test_second_trigger_while_in_flight_conflicts() {
        let (_, coordinator) = setup(5);
        let coordinator = Arc::new(coordinator);
        let api = Arc::new(FakeJobApi::new());
        api.push_trigger_result(Ok(2));
        let gate = api.gate_triggers();

        let first = {
            let coordinator = Arc::clone(&coordinator);
            let api = Arc::clone(&api);
            tokio::spawn(async move { coordinator.trigger(111, api.as_ref()).await })
        };
        while coordinator.pending(111).is_none() {
            tokio::task::yield_now().await;
        }

        let second = coordinator.trigger(111, api.as_ref()).await;
        assert_eq!(second, Err(ActionError::Conflict { job_id: 111 }));
        assert_eq!(coordinator.pending_count(), 1);
        assert!(!coordinator.can_act(111));

        gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.result_run_id, Some(2));
        assert_eq!(coordinator.pending_count(), 1);
        assert_eq!(api.trigger_calls(), vec![111]);
    }

    #[tokio::test]
    async fn test_trigger_allowed_once_previous_returned() {
        let (_, coordinator) = setup(5);
        let api = FakeJobApi::new();
        api.push_trigger_result(Ok(2));
        api.push_trigger_result(Ok(3));

        coordinator.trigger(111, &api).await.unwrap();
        let second = coordinator.trigger(111, &api).await.unwrap();

        assert_eq!(second.result_run_id, Some(3));
        assert_eq!(coordinator.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_without_running_run_makes_no_call() {
        let (cache, coordinator) = setup(5);
        let api = FakeJobApi::new();

        let err = coordinator.cancel(111, &api).await.unwrap_err();
        assert_eq!(err, ActionError::NoActiveRun { job_id: 111 });

        cache.store_success(111, None, vec![run(111, 1, 100, RunState::Success)], at(150));
        let err = coordinator.cancel(111, &api).await.unwrap_err();
        assert_eq!(err, ActionError::NoActiveRun { job_id: 111 });

        assert!(api.cancel_calls().is_empty());
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_targets_latest_running_run() {
        let (cache, coordinator) = setup(5);
        let api = FakeJobApi::new();
        cache.store_success(
            111,
            None,
            vec![run(111, 2, 200, RunState::Running), run(111, 1, 100, RunState::Success)],
            at(250),
        );

        let action = coordinator.cancel(111, &api).await.unwrap();

        assert_eq!(action.kind, ActionKind::Cancel);
        assert_eq!(action.target_run_id, Some(2));
        assert_eq!(action.status, ActionStatus::Submitted);
        assert_eq!(api.cancel_calls(), vec![2]);
    }

    #[tokio::test]
    async fn test_cancel_of_terminal_run_is_recorded() {
        let (cache, coordinator) = setup(5);
        let api = FakeJobApi::new();
        api.push_cancel_result(Err(ClientError::AlreadyTerminal("run 2".into())));
        cache.store_success(111, None, vec![run(111, 2, 200, RunState::Running)], at(250));

        let action = coordinator.cancel(111, &api).await.unwrap();

        assert_eq!(action.status, ActionStatus::Failed);
        assert!(matches!(
            action.result_error,
            Some(ActionError::Remote(ClientError::AlreadyTerminal(_)))
        ));
    }

    #[test]
    fn test_reconcile_ignores_polls_issued_before_action() {
        let (_, coordinator) = setup(5);
        submitted_trigger(&coordinator, 111, 2, 100);

        let early = snapshot(111, 99, vec![run(111, 2, 98, RunState::Running)]);
        assert_eq!(coordinator.reconcile(111, &early), ReconcileOutcome::NotEligible);
        assert!(coordinator.pending(111).is_some());

        let late = snapshot(111, 101, vec![run(111, 2, 100, RunState::Running)]);
        assert!(matches!(
            coordinator.reconcile(111, &late),
            ReconcileOutcome::Confirmed(_)
        ));
        assert!(coordinator.pending(111).is_none());
        assert_eq!(
            coordinator.notice(111).map(|n| n.resolution),
            Some(Resolution::Confirmed)
        );
    }

    #[test]
    fn test_failed_poll_never_confirms() {
        let (_, coordinator) = setup(5);
        submitted_trigger(&coordinator, 111, 2, 100);

        // Stale runs already list run 2, but the poll itself failed.
        let mut failed = snapshot(111, 150, vec![run(111, 2, 100, RunState::Running)]);
        failed.fetch_error = Some(ClientError::Network("down".into()));

        assert_eq!(
            coordinator.reconcile(111, &failed),
            ReconcileOutcome::Pending { attempts: 1 }
        );
        assert_eq!(coordinator.pending(111).unwrap().reconcile_attempts, 1);
    }

    #[tokio::test]
    async fn test_outage_clears_action_after_max_attempts() {
        let (cache, coordinator) = setup(5);
        let api = FakeJobApi::new();
        api.set_runs(111, vec![run(111, 1, 50, RunState::Success)]);
        cache.refresh(111, &api).await;

        api.push_trigger_result(Ok(2));
        coordinator.trigger(111, &api).await.unwrap();
        api.fail_job(111, ClientError::Network("connection refused".into()));

        let mut outcomes = Vec::new();
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(2)).await;
            let snapshot = cache.refresh(111, &api).await;
            outcomes.push(coordinator.reconcile(111, &snapshot));
            if coordinator.pending(111).is_none() {
                break;
            }
        }

        assert_eq!(outcomes.len(), 5);
        assert!(matches!(
            outcomes.last(),
            Some(ReconcileOutcome::Unconfirmed(action))
                if action.result_error == Some(ActionError::ReconcileTimeout { attempts: 5 })
        ));
        assert_eq!(
            coordinator.notice(111).map(|n| n.resolution),
            Some(Resolution::Unconfirmed)
        );
    }

    #[test]
    fn test_reconcile_times_out_after_max_attempts() {
        let (_, coordinator) = setup(5);
        submitted_trigger(&coordinator, 111, 2, 100);
        let without_run = |t| snapshot(111, t, vec![run(111, 1, 50, RunState::Success)]);

        for attempt in 1..5 {
            assert_eq!(
                coordinator.reconcile(111, &without_run(100 + attempt as i64)),
                ReconcileOutcome::Pending { attempts: attempt }
            );
        }

        match coordinator.reconcile(111, &without_run(200)) {
            ReconcileOutcome::Unconfirmed(action) => {
                assert_eq!(
                    action.result_error,
                    Some(ActionError::ReconcileTimeout { attempts: 5 })
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(coordinator.pending(111).is_none());
        assert_eq!(
            coordinator.notice(111).map(|n| n.resolution),
            Some(Resolution::Unconfirmed)
        );
    }

    #[test]
    fn test_cancel_confirmed_once_target_stops_running() {
        let (cache, coordinator) = setup(5);
        cache.store_success(111, None, vec![run(111, 2, 200, RunState::Running)], at(250));
        let action = coordinator
            .begin(111, ActionKind::Cancel, Some(2), at(300))
            .unwrap();
        coordinator.finish(&action, Ok(None));

        let still_running = snapshot(111, 301, vec![run(111, 2, 200, RunState::Running)]);
        assert_eq!(
            coordinator.reconcile(111, &still_running),
            ReconcileOutcome::Pending { attempts: 1 }
        );

        // The job restarted itself: a new run is running, the target is canceled.
        let restarted = snapshot(
            111,
            302,
            vec![run(111, 3, 301, RunState::Running), run(111, 2, 200, RunState::Canceled)],
        );
        assert!(matches!(
            coordinator.reconcile(111, &restarted),
            ReconcileOutcome::Confirmed(_)
        ));
    }

    #[test]
    fn test_failed_action_cleared_on_next_eligible_poll() {
        let (_, coordinator) = setup(5);
        let action = coordinator
            .begin(111, ActionKind::Trigger, None, at(100))
            .unwrap();
        coordinator.finish(&action, Err(ClientError::Auth("expired".into())));

        assert!(matches!(
            coordinator.reconcile(111, &snapshot(111, 101, vec![])),
            ReconcileOutcome::Failed(_)
        ));
        assert!(coordinator.pending(111).is_none());
    }

    #[test]
    fn test_in_flight_action_is_not_reconciled() {
        let (_, coordinator) = setup(5);
        coordinator
            .begin(111, ActionKind::Trigger, None, at(100))
            .unwrap();

        assert_eq!(
            coordinator.reconcile(111, &snapshot(111, 500, vec![])),
            ReconcileOutcome::NotEligible
        );
    }

    #[test]
    fn test_reconcile_without_action_is_idle() {
        let (_, coordinator) = setup(5);
        assert_eq!(
            coordinator.reconcile(7, &snapshot(7, 1, vec![])),
            ReconcileOutcome::Idle
        );
    }

    #[tokio::test]
    async fn test_submission_requests_repoll() {
        let (_, coordinator) = setup(5);
        let api = FakeJobApi::new();
        api.push_trigger_result(Ok(2));
        let signal = coordinator.repoll_signal();

        coordinator.trigger(111, &api).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), signal.notified())
            .await
            .unwrap();
    }
}
