//! Backend abstraction for the queue that receives deferred jobs.
//!
//! The guard never owns a queue. It only needs somewhere to push a job for
//! later, so this trait covers enqueue, delayed enqueue and the two lengths
//! used for introspection.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Backend trait for job queue storage operations.
///
/// Implementations must be thread-safe (Send + Sync). All operations take a
/// `namespace` so several queues can share one connection.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Push a job to the immediate processing queue.
    async fn push_job(&self, ns: &str, job_json: &str) -> Result<()>;

    /// Get the number of jobs in the immediate queue.
    async fn queue_len(&self, ns: &str) -> Result<usize>;

    /// Schedule a job to run at a specific Unix timestamp.
    async fn schedule_job(&self, ns: &str, job_json: &str, run_at: i64) -> Result<()>;

    /// Get the number of jobs in the schedule queue.
    async fn schedule_len(&self, ns: &str) -> Result<usize>;
}

/// A type-erased backend that can be shared across threads.
pub type DynBackend = Arc<dyn Backend>;

/// Wrapper around Arc<dyn Backend> for convenience.
#[derive(Clone)]
pub struct SharedBackend {
    inner: DynBackend,
}

impl SharedBackend {
    /// Create a new SharedBackend from any Backend implementation.
    pub fn new<B: Backend + 'static>(backend: B) -> Self {
        Self {
            inner: Arc::new(backend),
        }
    }

    /// Wrap an already shared backend.
    pub fn from_arc(inner: DynBackend) -> Self {
        Self { inner }
    }

    /// Get a reference to the inner backend.
    pub fn inner(&self) -> &DynBackend {
        &self.inner
    }
}

#[async_trait]
impl Backend for SharedBackend {
    async fn push_job(&self, ns: &str, job_json: &str) -> Result<()> {
        self.inner.push_job(ns, job_json).await
    }

    async fn queue_len(&self, ns: &str) -> Result<usize> {
        self.inner.queue_len(ns).await
    }

    async fn schedule_job(&self, ns: &str, job_json: &str, run_at: i64) -> Result<()> {
        self.inner.schedule_job(ns, job_json, run_at).await
    }

    async fn schedule_len(&self, ns: &str) -> Result<usize> {
        self.inner.schedule_len(ns).await
    }
}
