//! Status cache
//!
//! Per-job snapshot of the most recent run history. Snapshots are replaced
//! wholesale under the write lock; a failed fetch keeps the previous runs and
//! only records the error, so a card never goes blank because one poll
//! failed.

use chrono::{DateTime, Utc};
use jobdeck_client::{ClientError, JobApi};
use jobdeck_core::domain::job::JobId;
use jobdeck_core::domain::run::{RunId, RunRecord, newest_runs};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::MAX_RUN_HISTORY;
use crate::deadline::bounded;

/// Cached view of one job's recent runs
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub job_id: JobId,
    /// Job name reported by the remote API
    pub job_name: Option<String>,
    /// Most recent first, at most the configured history limit
    pub runs: Vec<RunRecord>,
    /// When the last successful fetch was issued; `None` until one succeeds
    pub fetched_at: Option<DateTime<Utc>>,
    /// When the last fetch, successful or not, was issued
    pub attempted_at: DateTime<Utc>,
    /// Error of the last fetch; `runs` are stale while this is set
    pub fetch_error: Option<ClientError>,
}

impl JobSnapshot {
    /// Latest run, if the job has any
    pub fn latest_run(&self) -> Option<&RunRecord> {
        self.runs.first()
    }

    pub fn run(&self, run_id: RunId) -> Option<&RunRecord> {
        self.runs.iter().find(|run| run.run_id == run_id)
    }

    /// Whether the runs shown are left over from an earlier poll
    pub fn is_stale(&self) -> bool {
        self.fetch_error.is_some()
    }

    /// Id of the latest run when it is currently running
    pub fn active_run_id(&self) -> Option<RunId> {
        self.latest_run()
            .filter(|run| run.is_running())
            .map(|run| run.run_id)
    }
}

/// In-memory snapshot store for one session
pub struct StatusCache {
    snapshots: RwLock<HashMap<JobId, JobSnapshot>>,
    history_limit: usize,
    request_timeout: Duration,
}

impl StatusCache {
    pub fn new(history_limit: usize, request_timeout: Duration) -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            history_limit: history_limit.clamp(1, MAX_RUN_HISTORY),
            request_timeout,
        }
    }

    /// Pure lookup, never performs I/O
    pub fn get(&self, job_id: JobId) -> Option<JobSnapshot> {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .cloned()
    }

    /// Fetches runs and metadata for one job and stores the outcome
    ///
    /// Never fails: errors are attached to the stored snapshot.
    pub async fn refresh(&self, job_id: JobId, client: &dyn JobApi) -> JobSnapshot {
        let started = Utc::now();
        debug!("Refreshing job {}", job_id);

        let (runs, meta) = tokio::join!(
            bounded(
                self.request_timeout,
                client.list_runs_for_job(job_id, self.history_limit)
            ),
            bounded(self.request_timeout, client.get_job_meta(job_id)),
        );

        match (runs, meta) {
            (Ok(runs), Ok(meta)) => self.store_success(job_id, Some(meta.name), runs, started),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to refresh job {}: {}", job_id, e);
                self.store_failure(job_id, e, started)
            }
        }
    }

    /// Refreshes every job concurrently
    ///
    /// Each job is fetched in its own task so a slow or failing job neither
    /// delays nor aborts the others. Results come back in `job_ids` order.
    pub async fn refresh_all(
        self: &Arc<Self>,
        job_ids: &[JobId],
        client: Arc<dyn JobApi>,
    ) -> Vec<JobSnapshot> {
        let handles: Vec<_> = job_ids
            .iter()
            .map(|&job_id| {
                let cache = Arc::clone(self);
                let client = Arc::clone(&client);
                (
                    job_id,
                    tokio::spawn(async move { cache.refresh(job_id, client.as_ref()).await }),
                )
            })
            .collect();

        let mut snapshots = Vec::with_capacity(handles.len());
        for (job_id, handle) in handles {
            match handle.await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!("Refresh task for job {} panicked: {}", job_id, e);
                    if let Some(previous) = self.get(job_id) {
                        snapshots.push(previous);
                    }
                }
            }
        }
        snapshots
    }

    /// Replaces the snapshot with fresh runs, ordered and bounded
    ///
    /// A fetch that started before the stored one is discarded so an older
    /// response can never overwrite a newer one.
    pub(crate) fn store_success(
        &self,
        job_id: JobId,
        job_name: Option<String>,
        runs: Vec<RunRecord>,
        started: DateTime<Utc>,
    ) -> JobSnapshot {
        let mut snapshots = self
            .snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = snapshots.get(&job_id) {
            if existing.fetched_at.is_some_and(|at| at > started) {
                debug!("Discarding out-of-order fetch for job {}", job_id);
                return existing.clone();
            }
        }

        let snapshot = JobSnapshot {
            job_id,
            job_name,
            runs: newest_runs(runs, self.history_limit),
            fetched_at: Some(started),
            attempted_at: started,
            fetch_error: None,
        };
        snapshots.insert(job_id, snapshot.clone());
        snapshot
    }

    /// Records a failed fetch, keeping whatever runs were cached before
    ///
    /// Dropped when a later fetch already stored its result.
    pub(crate) fn store_failure(
        &self,
        job_id: JobId,
        error: ClientError,
        started: DateTime<Utc>,
    ) -> JobSnapshot {
        let mut snapshots = self
            .snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = snapshots.get(&job_id) {
            if existing.attempted_at > started {
                debug!("Discarding out-of-order failure for job {}", job_id);
                return existing.clone();
            }
        }

        let snapshot = match snapshots.get(&job_id) {
            Some(previous) => JobSnapshot {
                attempted_at: started,
                fetch_error: Some(error),
                ..previous.clone()
            },
            None => JobSnapshot {
                job_id,
                job_name: None,
                runs: Vec::new(),
                fetched_at: None,
                attempted_at: started,
                fetch_error: Some(error),
            },
        };
        snapshots.insert(job_id, snapshot.clone());
        snapshot
    }
}
