//! Job envelope and the invocation payload it carries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new random JobId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A guarded unit of work: the task class plus its opaque, ordered arguments.
///
/// This is what gets executed and, when deferred, re-enqueued verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInvocation {
    /// Name of the task class to run.
    pub task_class: String,
    /// Arguments forwarded to the task body as-is.
    #[serde(default)]
    pub arguments: Vec<Value>,
    /// Remaining lease attempts before the job is abandoned. `None` is unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_attempts: Option<u32>,
}

impl TaskInvocation {
    /// Create an invocation with unbounded lease attempts.
    pub fn new(task_class: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            task_class: task_class.into(),
            arguments,
            lease_attempts: None,
        }
    }

    /// Set the remaining lease attempts.
    pub fn with_lease_attempts(mut self, attempts: Option<u32>) -> Self {
        self.lease_attempts = attempts;
        self
    }
}

/// The status of a job envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Job is ready for immediate execution.
    Pending,
    /// Job is scheduled for future execution.
    Scheduled,
}

/// A job with its payload and metadata, as handed to a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job<T> {
    /// Unique job identifier.
    pub id: JobId,
    /// Job type name used by the queue for routing.
    pub job_name: String,
    /// The job payload.
    pub payload: T,
    /// Current job status.
    pub status: JobStatus,
    /// Timestamp when the job was created (Unix timestamp in seconds).
    pub created_at: i64,
    /// Optional timestamp when the job should run (for scheduled jobs).
    pub scheduled_at: Option<i64>,
}

impl<T> Job<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    /// Create a new job with the given payload.
    pub fn new(job_name: impl Into<String>, payload: T) -> Self {
        Self {
            id: JobId::new(),
            job_name: job_name.into(),
            payload,
            status: JobStatus::Pending,
            created_at: current_timestamp(),
            scheduled_at: None,
        }
    }

    /// Schedule the job to run at a specific time.
    pub fn schedule_at(mut self, timestamp: i64) -> Self {
        self.scheduled_at = Some(timestamp);
        self.status = JobStatus::Scheduled;
        self
    }

    /// Schedule the job to run after a delay.
    ///
    /// The due time is `now + delay` rounded up to the next whole second, so a
    /// deferred job never becomes due before the lease it waits on has expired.
    pub fn schedule_in(self, delay: Duration) -> Self {
        let run_at = due_timestamp(since_epoch(), delay);
        self.schedule_at(run_at)
    }

    /// Serialize the job to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a job from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Get current Unix timestamp in seconds.
pub(crate) fn current_timestamp() -> i64 {
    since_epoch().as_secs() as i64
}

fn since_epoch() -> Duration {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
}

/// Whole-second Unix timestamp no earlier than `now + delay`.
fn due_timestamp(now: Duration, delay: Duration) -> i64 {
    let due = now + delay;
    let mut secs = due.as_secs() as i64;
    if due.subsec_nanos() > 0 {
        secs += 1;
    }
    secs
}
