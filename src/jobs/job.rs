use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::state::{JobStatus, PollStatus};

/// Which kind of work a job performs; decides which result fields matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Translation,
    Packaging,
}

/// One timestamped line of a job's progress log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

/// Short job ids, like `3f9a0c1e`.
pub fn generate_job_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Mutable state of one job, owned by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Latest short status line; mirrors the newest log entry.
    pub message: String,
    pub logs: Vec<LogEntry>,
    /// Artifacts produced so far, keyed by role (e.g. `translation`).
    pub files: BTreeMap<String, PathBuf>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(id: String, kind: JobKind, message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            status: JobStatus::Running,
            message: message.into(),
            logs: Vec::new(),
            files: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a log line. Returns `false` once the job is terminal.
    pub fn append_log(&mut self, message: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let entry = LogEntry {
            at: Utc::now(),
            message: message.into(),
        };
        self.message = entry.message.clone();
        self.updated_at = entry.at;
        self.logs.push(entry);
        true
    }

    pub fn record_file(&mut self, role: impl Into<String>, path: PathBuf) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.files.insert(role.into(), path);
        self.updated_at = Utc::now();
        true
    }

    /// Log the terminal message, then move to `status`. Refuses anything
    /// that is not a forward transition.
    pub fn finish(&mut self, status: JobStatus, message: impl Into<String>) -> bool {
        if !self.status.can_transition_to(status) {
            return false;
        }
        self.append_log(message);
        self.status = status;
        true
    }
}

/// What a poller sees: a consistent copy of a job record at one instant.
/// Serialized log entries are plain `[HH:MM:SS] message` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub status: PollStatus,
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(serialize_with = "clock_lines")]
    pub logs: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<JobKind>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, PathBuf>,
}

fn clock_lines<S: Serializer>(logs: &[LogEntry], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(logs.iter().map(LogEntry::to_string))
}

impl JobSnapshot {
    pub fn unknown() -> Self {
        Self {
            status: PollStatus::Unknown,
            message: String::new(),
            logs: Vec::new(),
            kind: None,
            files: BTreeMap::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, PollStatus::Done | PollStatus::Error)
    }
}

impl From<&JobRecord> for JobSnapshot {
    fn from(record: &JobRecord) -> Self {
        Self {
            status: record.status.into(),
            message: record.message.clone(),
            logs: record.logs.clone(),
            kind: Some(record.kind),
            files: record.files.clone(),
        }
    }
}
