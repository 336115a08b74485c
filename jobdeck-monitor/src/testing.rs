//! Scripted `JobApi` fake shared by the monitor's unit tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobdeck_client::{ClientError, JobApi, Result};
use jobdeck_core::domain::job::{JobId, JobMeta};
use jobdeck_core::domain::run::{RunId, RunRecord, RunState};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub fn run(job_id: JobId, run_id: RunId, started: i64, state: RunState) -> RunRecord {
    RunRecord {
        run_id,
        job_id,
        state,
        started_at: at(started),
        ended_at: None,
        duration_seconds: None,
        run_page_url: None,
    }
}

#[derive(Default)]
struct State {
    runs: HashMap<JobId, Vec<RunRecord>>,
    job_failures: HashMap<JobId, ClientError>,
    meta_failures: HashMap<JobId, ClientError>,
    hung_jobs: HashSet<JobId>,
    trigger_results: VecDeque<Result<RunId>>,
    cancel_results: VecDeque<Result<()>>,
    list_calls: usize,
    trigger_calls: Vec<JobId>,
    cancel_calls: Vec<RunId>,
}

#[derive(Default)]
pub struct FakeJobApi {
    state: Mutex<State>,
    trigger_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeJobApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_runs(&self, job_id: JobId, runs: Vec<RunRecord>) {
        let mut state = self.state.lock().unwrap();
        state.job_failures.remove(&job_id);
        state.runs.insert(job_id, runs);
    }

    pub fn fail_job(&self, job_id: JobId, error: ClientError) {
        self.state.lock().unwrap().job_failures.insert(job_id, error);
    }

    pub fn fail_meta(&self, job_id: JobId, error: ClientError) {
        self.state.lock().unwrap().meta_failures.insert(job_id, error);
    }

    /// Makes run listing for the job never return
    pub fn hang_job(&self, job_id: JobId) {
        self.state.lock().unwrap().hung_jobs.insert(job_id);
    }

    pub fn push_trigger_result(&self, result: Result<RunId>) {
        self.state.lock().unwrap().trigger_results.push_back(result);
    }

    pub fn push_cancel_result(&self, result: Result<()>) {
        self.state.lock().unwrap().cancel_results.push_back(result);
    }

    /// Holds every `trigger_run` call until the returned notify is signalled
    pub fn gate_triggers(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.trigger_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn trigger_calls(&self) -> Vec<JobId> {
        self.state.lock().unwrap().trigger_calls.clone()
    }

    pub fn cancel_calls(&self) -> Vec<RunId> {
        self.state.lock().unwrap().cancel_calls.clone()
    }
}

#[async_trait]
impl JobApi for FakeJobApi {
    async fn list_runs_for_job(&self, job_id: JobId, limit: usize) -> Result<Vec<RunRecord>> {
        let hung = {
            let mut state = self.state.lock().unwrap();
            state.list_calls += 1;
            state.hung_jobs.contains(&job_id)
        };
        if hung {
            std::future::pending::<()>().await;
        }

        let state = self.state.lock().unwrap();
        if let Some(error) = state.job_failures.get(&job_id) {
            return Err(error.clone());
        }
        let mut runs = state.runs.get(&job_id).cloned().unwrap_or_default();
        runs.truncate(limit);
        Ok(runs)
    }

    async fn get_job_meta(&self, job_id: JobId) -> Result<JobMeta> {
        let state = self.state.lock().unwrap();
        if let Some(error) = state.meta_failures.get(&job_id) {
            return Err(error.clone());
        }
        if let Some(error) = state.job_failures.get(&job_id) {
            return Err(error.clone());
        }
        Ok(JobMeta {
            job_id,
            name: format!("job-{}", job_id),
            creator: None,
        })
    }

    async fn trigger_run(&self, job_id: JobId) -> Result<RunId> {
        let gate = self.trigger_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        state.trigger_calls.push(job_id);
        state
            .trigger_results
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Validation("no scripted run".into())))
    }

    async fn cancel_run(&self, run_id: RunId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.cancel_calls.push(run_id);
        state.cancel_results.pop_front().unwrap_or(Ok(()))
    }
}
