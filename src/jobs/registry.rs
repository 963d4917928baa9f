//! Process-wide job registry and the per-job progress log handle.
//!
//! The registry maps job ids to records, each behind its own mutex, so a
//! poller reading one job never observes a half-applied update and never
//! contends with workers of another job. Workers only ever touch a job
//! through its [`JobHandle`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{info, warn};

use super::job::{JobKind, JobRecord, JobSnapshot, generate_job_id};
use super::state::JobStatus;
use crate::error::SeasideError;

type SharedRecord = Arc<Mutex<JobRecord>>;

#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, SharedRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `running` job. A caller-supplied id must be unused.
    pub fn create(
        &self,
        id: Option<String>,
        kind: JobKind,
        message: impl Into<String>,
    ) -> Result<JobHandle, SeasideError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let id = match id {
            Some(id) if jobs.contains_key(&id) => return Err(SeasideError::DuplicateJob(id)),
            Some(id) => id,
            None => loop {
                let candidate = generate_job_id();
                if !jobs.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        let record = Arc::new(Mutex::new(JobRecord::new(id.clone(), kind, message)));
        jobs.insert(id.clone(), Arc::clone(&record));
        Ok(JobHandle { id, record })
    }

    /// Current view of a job; unknown ids yield an `unknown` snapshot.
    pub fn poll(&self, id: &str) -> JobSnapshot {
        match self.record(id) {
            Some(record) => JobSnapshot::from(&*lock(&record)),
            None => JobSnapshot::unknown(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, id: &str) -> Option<SharedRecord> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

fn lock(record: &Mutex<JobRecord>) -> MutexGuard<'_, JobRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write access to a single job: its progress log, result files and
/// terminal status. Cheap to clone; all clones share the same record.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: String,
    record: SharedRecord,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append a progress entry and mirror it to the tracing log.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(job_id = %self.id, "{message}");
        if !lock(&self.record).append_log(message) {
            warn!(job_id = %self.id, "log entry dropped, job already finished");
        }
    }

    pub fn add_file(&self, role: &str, path: PathBuf) {
        lock(&self.record).record_file(role, path);
    }

    pub fn complete(&self, message: impl Into<String>) {
        self.finish(JobStatus::Done, message.into());
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.finish(JobStatus::Error, message.into());
    }

    fn finish(&self, status: JobStatus, message: String) {
        info!(job_id = %self.id, %status, "{message}");
        if !lock(&self.record).finish(status, message) {
            warn!(job_id = %self.id, %status, "ignored transition, job already finished");
        }
    }
}
