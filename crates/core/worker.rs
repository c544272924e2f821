//! Task bodies executed behind the guard.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;

use crate::job::TaskInvocation;

/// Result type for task bodies.
pub type JobResult = std::result::Result<(), JobError>;

/// Error returned from task bodies.
///
/// The guard hands this back to the caller untouched; retry decisions belong
/// to the surrounding queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobError {
    /// Error message.
    pub message: String,
    /// Whether the job should be retried.
    pub retryable: bool,
}

impl JobError {
    /// Create a new retryable error.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// Create a new non-retryable error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl<E: std::error::Error> From<E> for JobError {
    fn from(err: E) -> Self {
        Self::retryable(err.to_string())
    }
}

/// The unit of work a guard protects.
///
/// Implementations receive the task class name and the opaque argument list
/// exactly as they were enqueued.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Run the task body.
    async fn perform_task(&self, invocation: &TaskInvocation) -> JobResult;
}

/// Adapts an async closure into a [`TaskRunner`].
pub struct FnTask<F> {
    handler: F,
}

impl<F, Fut> FnTask<F>
where
    F: Fn(TaskInvocation) -> Fut + Send + Sync,
    Fut: Future<Output = JobResult> + Send,
{
    /// Wrap a handler.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F, Fut> TaskRunner for FnTask<F>
where
    F: Fn(TaskInvocation) -> Fut + Send + Sync,
    Fut: Future<Output = JobResult> + Send,
{
    async fn perform_task(&self, invocation: &TaskInvocation) -> JobResult {
        (self.handler)(invocation.clone()).await
    }
}
