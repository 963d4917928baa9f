use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a job in the registry.
///
/// Jobs start `Running` and move exactly once to a terminal state:
/// `Running → Done` or `Running → Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Error,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }

    /// Whether `self → next` is a legal, forward-only transition.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Running, JobStatus::Done) | (JobStatus::Running, JobStatus::Error)
        )
    }
}

/// Status as seen by a poller, which may ask about ids the registry never saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Running,
    Done,
    Error,
    Unknown,
}

impl From<JobStatus> for PollStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Running => PollStatus::Running,
            JobStatus::Done => PollStatus::Done,
            JobStatus::Error => PollStatus::Error,
        }
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollStatus::Running => write!(f, "running"),
            PollStatus::Done => write!(f, "done"),
            PollStatus::Error => write!(f, "error"),
            PollStatus::Unknown => write!(f, "unknown"),
        }
    }
}
