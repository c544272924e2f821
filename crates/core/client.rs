//! Client that hands deferred jobs back to the queue.

use async_trait::async_trait;
use std::time::Duration;

use crate::backend::{Backend, SharedBackend};
use crate::config::ClientConfig;
use crate::error::{JgError, Result};
use crate::job::{Job, JobId, TaskInvocation};

/// Callback into the surrounding scheduler for future execution.
///
/// Implementations must keep the invocation's arguments exactly as given.
#[async_trait]
pub trait Reenqueuer: Send + Sync {
    async fn reenqueue(&self, invocation: &TaskInvocation, delay: Duration) -> Result<()>;
}

/// Client for enqueueing guarded jobs into a namespaced queue.
#[derive(Clone)]
pub struct Client<B: Backend + Clone = SharedBackend> {
    backend: B,
    namespace: String,
}

impl Client<SharedBackend> {
    /// Create a new client with a shared backend.
    pub fn new(backend: impl Backend + 'static, config: ClientConfig) -> Self {
        Self {
            backend: SharedBackend::new(backend),
            namespace: config.namespace,
        }
    }
}

impl<B: Backend + Clone> Client<B> {
    /// Create a new client with a specific backend.
    pub fn with_backend(backend: B, config: ClientConfig) -> Self {
        Self {
            backend,
            namespace: config.namespace,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Enqueue an invocation for immediate processing.
    ///
    /// This is how work first reaches the queue; the guard only ever schedules.
    pub async fn enqueue(&self, invocation: TaskInvocation) -> Result<JobId> {
        let job = Job::new(invocation.task_class.clone(), invocation);
        let job_id = job.id.clone();
        let json = job.to_json()?;

        self.backend.push_job(&self.namespace, &json).await?;

        tracing::debug!(job_id = %job_id, job_name = %job.job_name, "Job enqueued");
        Ok(job_id)
    }

    /// Schedule an invocation to run after a delay.
    pub async fn schedule(&self, invocation: TaskInvocation, delay: Duration) -> Result<JobId> {
        let job = Job::new(invocation.task_class.clone(), invocation).schedule_in(delay);
        self.schedule_job(job).await
    }

    /// Schedule a pre-built job.
    pub async fn schedule_job(&self, job: Job<TaskInvocation>) -> Result<JobId> {
        let job_id = job.id.clone();
        let run_at = job.scheduled_at.ok_or_else(|| {
            JgError::Config("Job must have scheduled_at set for scheduling".to_string())
        })?;
        let json = job.to_json()?;

        self.backend
            .schedule_job(&self.namespace, &json, run_at)
            .await?;

        tracing::debug!(job_id = %job_id, run_at = run_at, "Job scheduled");
        Ok(job_id)
    }

    /// Get the number of jobs in the immediate queue.
    pub async fn queue_len(&self) -> Result<usize> {
        self.backend.queue_len(&self.namespace).await
    }

    /// Get the number of jobs in the schedule queue.
    pub async fn schedule_len(&self) -> Result<usize> {
        self.backend.schedule_len(&self.namespace).await
    }
}

#[async_trait]
impl<B: Backend + Clone> Reenqueuer for Client<B> {
    async fn reenqueue(&self, invocation: &TaskInvocation, delay: Duration) -> Result<()> {
        self.schedule(invocation.clone(), delay).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingBackend {
        pushed: Arc<Mutex<Vec<(String, String)>>>,
        scheduled: Arc<Mutex<Vec<(String, String, i64)>>>,
    }

    #[async_trait]
    impl Backend for RecordingBackend {
        async fn push_job(&self, ns: &str, job_json: &str) -> Result<()> {
            self.pushed
                .lock()
                .unwrap()
                .push((ns.to_string(), job_json.to_string()));
            Ok(())
        }

        async fn queue_len(&self, _ns: &str) -> Result<usize> {
            Ok(self.pushed.lock().unwrap().len())
        }

        async fn schedule_job(&self, ns: &str, job_json: &str, run_at: i64) -> Result<()> {
            self.scheduled
                .lock()
                .unwrap()
                .push((ns.to_string(), job_json.to_string(), run_at));
            Ok(())
        }

        async fn schedule_len(&self, _ns: &str) -> Result<usize> {
            Ok(self.scheduled.lock().unwrap().len())
        }
    }

    #[tokio::test]
    async fn test_enqueue_uses_namespace() {
        let backend = RecordingBackend::default();
        let client = Client::with_backend(backend.clone(), ClientConfig::new("maint"));

        client
            .enqueue(TaskInvocation::new("CopyColumn", vec![json!(1)]))
            .await
            .unwrap();

        assert_eq!(client.queue_len().await.unwrap(), 1);
        let pushed = backend.pushed.lock().unwrap();
        assert_eq!(pushed[0].0, "maint");
        let job: Job<TaskInvocation> = Job::from_json(&pushed[0].1).unwrap();
        assert_eq!(job.job_name, "CopyColumn");
    }

    #[tokio::test]
    async fn test_reenqueue_preserves_arguments() {
        let backend = RecordingBackend::default();
        let client = Client::with_backend(backend.clone(), ClientConfig::new("maint"));
        let invocation = TaskInvocation::new("CopyColumn", vec![json!("users"), json!({"batch": 10})]);

        let before = crate::job::current_timestamp();
        client
            .reenqueue(&invocation, Duration::from_secs(120))
            .await
            .unwrap();

        assert_eq!(client.schedule_len().await.unwrap(), 1);
        let scheduled = backend.scheduled.lock().unwrap();
        let (ns, json, run_at) = &scheduled[0];
        assert_eq!(ns, "maint");
        assert!(*run_at >= before + 120);

        let job: Job<TaskInvocation> = Job::from_json(json).unwrap();
        assert_eq!(job.payload, invocation);
        assert_eq!(job.scheduled_at, Some(*run_at));
    }

    #[tokio::test]
    async fn test_schedule_job_requires_timestamp() {
        let client = Client::new(RecordingBackend::default(), ClientConfig::default());
        let job = Job::new("CopyColumn", TaskInvocation::new("CopyColumn", vec![]));
        let err = client.schedule_job(job).await.unwrap_err();
        assert!(matches!(err, JgError::Config(_)));
    }
}
