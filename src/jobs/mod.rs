mod job;
mod registry;
mod state;

pub use job::{JobKind, JobRecord, JobSnapshot, LogEntry, generate_job_id};
pub use registry::{JobHandle, JobRegistry};
pub use state::{JobStatus, PollStatus};
