//! Lease-gated, health-aware execution of maintenance tasks.
//!
//! For each invocation the guard tries once to take the lease
//! `"{guard_name}:{task_class}"`. Only the holder checks health, and only a
//! healthy holder runs the task body. Every other path re-enqueues the same
//! invocation for roughly when the lease will have expired. Lease and health
//! failures never surface as errors; task body errors always do.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jg_core::{
//!     ExecutionGuard, FnTask, GuardConfig, HealthFlag, MemoryLeaseStore, Reenqueuer,
//!     TaskInvocation,
//! };
//!
//! # async fn run(reenqueuer: Arc<dyn Reenqueuer>) -> jg_core::Result<()> {
//! let guard = ExecutionGuard::builder()
//!     .config(
//!         GuardConfig::builder()
//!             .unhealthy_counter("background_migration_unhealthy_total")
//!             .build()?,
//!     )
//!     .lease_store(Arc::new(MemoryLeaseStore::new()))
//!     .health(Arc::new(HealthFlag::default()))
//!     .reenqueuer(reenqueuer)
//!     .task(Arc::new(FnTask::new(|_invocation: TaskInvocation| async { Ok(()) })))
//!     .build()?;
//!
//! guard.perform("BackgroundMigration", vec![]).await?;
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::client::Reenqueuer;
use crate::config::{GuardConfig, SchedulingPolicy};
use crate::error::{JgError, Result};
use crate::health::{DynHealthSignal, HealthFlag};
use crate::job::TaskInvocation;
use crate::lease::{DynLeaseStore, Lease, LeaseAcquisition, MemoryLeaseStore};
use crate::telemetry::{DynMetrics, GlobalMetrics};
use crate::worker::TaskRunner;

/// Outcome of the scheduling decision alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionDecision {
    pub should_perform: bool,
    /// Lease TTL known at decision time, if any.
    pub ttl: Option<Duration>,
}

/// What `perform` did with an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformOutcome {
    /// The task body ran and returned `Ok`.
    Executed,
    /// The invocation was re-enqueued to run after `delay`.
    Deferred { delay: Duration },
    /// Lease attempts ran out; the invocation was dropped.
    Abandoned,
}

/// Single-flight, health-aware wrapper around a task body.
pub struct ExecutionGuard {
    config: GuardConfig,
    leases: DynLeaseStore,
    health: DynHealthSignal,
    reenqueuer: Arc<dyn Reenqueuer>,
    task: Arc<dyn TaskRunner>,
    metrics: DynMetrics,
}

impl ExecutionGuard {
    pub fn builder() -> ExecutionGuardBuilder {
        ExecutionGuardBuilder::new()
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Run `task_class` with `arguments` if the lease and health allow it.
    pub async fn perform(
        &self,
        task_class: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Result<PerformOutcome> {
        self.perform_invocation(&TaskInvocation::new(task_class, arguments))
            .await
    }

    /// Run a dequeued invocation, carrying its remaining lease attempts.
    pub async fn perform_invocation(&self, invocation: &TaskInvocation) -> Result<PerformOutcome> {
        let decision = self.perform_and_check_ttl(&invocation.task_class).await;

        if decision.should_perform {
            debug!(task_class = %invocation.task_class, "Performing task");
            self.task
                .perform_task(invocation)
                .await
                .map_err(JgError::Task)?;
            return Ok(PerformOutcome::Executed);
        }

        let delay = decision.ttl.unwrap_or(self.config.minimum_interval);
        let lease_attempts = match invocation.lease_attempts.or(self.config.max_lease_attempts) {
            Some(attempts) => {
                let left = attempts.saturating_sub(1);
                if left == 0 {
                    warn!(
                        task_class = %invocation.task_class,
                        "Lease attempts exhausted, abandoning job"
                    );
                    return Ok(PerformOutcome::Abandoned);
                }
                Some(left)
            }
            None => None,
        };

        let deferred = invocation.clone().with_lease_attempts(lease_attempts);
        self.reenqueuer.reenqueue(&deferred, delay).await?;

        info!(
            task_class = %invocation.task_class,
            delay_ms = delay.as_millis() as u64,
            lease_attempts = ?lease_attempts,
            "Job deferred"
        );
        Ok(PerformOutcome::Deferred { delay })
    }

    /// Decide whether `task_class` may run now.
    ///
    /// Takes the lease when it is free. Store and health errors count as a
    /// refusal.
    pub async fn perform_and_check_ttl(&self, task_class: &str) -> ExecutionDecision {
        if self.always_perform() {
            return ExecutionDecision {
                should_perform: true,
                ttl: None,
            };
        }

        let lease = self.lease_for(task_class);
        match lease.try_obtain().await {
            Ok(LeaseAcquisition::Acquired) => {}
            Ok(LeaseAcquisition::Held { remaining }) => {
                debug!(
                    task_class = %task_class,
                    lease_key = %lease.key(),
                    "Lease held elsewhere"
                );
                return ExecutionDecision {
                    should_perform: false,
                    ttl: remaining,
                };
            }
            Err(err) => {
                warn!(
                    task_class = %task_class,
                    lease_key = %lease.key(),
                    error = %err,
                    "Lease store failed, deferring"
                );
                return ExecutionDecision {
                    should_perform: false,
                    ttl: None,
                };
            }
        }

        if !self.is_healthy().await {
            self.on_unhealthy();
            return ExecutionDecision {
                should_perform: false,
                ttl: Some(lease.ttl()),
            };
        }

        ExecutionDecision {
            should_perform: true,
            ttl: Some(lease.ttl()),
        }
    }

    /// Build, without acquiring, the lease scoped to `task_class`.
    pub fn lease_for(&self, task_class: &str) -> Lease {
        Lease::new(
            self.leases.clone(),
            format!("{}:{}", self.config.guard_name, task_class),
            self.config.minimum_interval,
        )
    }

    /// True under [`SchedulingPolicy::Immediate`], a test-harness bypass.
    pub fn always_perform(&self) -> bool {
        self.config.policy == SchedulingPolicy::Immediate
    }

    pub async fn is_healthy(&self) -> bool {
        match self.health.is_healthy().await {
            Ok(healthy) => healthy,
            Err(err) => {
                warn!(error = %err, "Health signal failed, treating as unhealthy");
                false
            }
        }
    }

    pub fn on_unhealthy(&self) {
        self.metrics
            .increment_counter(&self.config.unhealthy_counter);
    }
}

/// Builder for ExecutionGuard.
#[derive(Default)]
pub struct ExecutionGuardBuilder {
    config: Option<GuardConfig>,
    leases: Option<DynLeaseStore>,
    health: Option<DynHealthSignal>,
    reenqueuer: Option<Arc<dyn Reenqueuer>>,
    task: Option<Arc<dyn TaskRunner>>,
    metrics: Option<DynMetrics>,
}

impl ExecutionGuardBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the guard configuration.
    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the shared lease store.
    pub fn lease_store(mut self, store: DynLeaseStore) -> Self {
        self.leases = Some(store);
        self
    }

    /// Set the health signal.
    pub fn health(mut self, health: DynHealthSignal) -> Self {
        self.health = Some(health);
        self
    }

    /// Set the re-enqueue callback.
    pub fn reenqueuer(mut self, reenqueuer: Arc<dyn Reenqueuer>) -> Self {
        self.reenqueuer = Some(reenqueuer);
        self
    }

    /// Set the task body.
    pub fn task(mut self, task: Arc<dyn TaskRunner>) -> Self {
        self.task = Some(task);
        self
    }

    /// Set the metrics sink. Defaults to [`GlobalMetrics`].
    pub fn metrics(mut self, metrics: DynMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the guard.
    ///
    /// The lease store and health signal may be omitted under
    /// [`SchedulingPolicy::Immediate`], where they are never consulted.
    pub fn build(self) -> Result<ExecutionGuard> {
        let config = self.config.ok_or(JgError::NotImplemented("guard config"))?;
        let task = self.task.ok_or(JgError::NotImplemented("task body"))?;
        let reenqueuer = self.reenqueuer.ok_or(JgError::NotImplemented("reenqueuer"))?;

        let immediate = config.policy == SchedulingPolicy::Immediate;
        let leases = match self.leases {
            Some(leases) => leases,
            None if immediate => Arc::new(MemoryLeaseStore::new()),
            None => return Err(JgError::NotImplemented("lease store")),
        };
        let health = match self.health {
            Some(health) => health,
            None if immediate => Arc::new(HealthFlag::default()),
            None => return Err(JgError::NotImplemented("health signal")),
        };

        Ok(ExecutionGuard {
            config,
            leases,
            health,
            reenqueuer,
            task,
            metrics: self.metrics.unwrap_or_else(|| Arc::new(GlobalMetrics)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthSignal;
    use crate::lease::LeaseStore;
    use crate::telemetry::Metrics;
    use crate::worker::{JobError, JobResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const COUNTER: &str = "background_migration_unhealthy_total";

    #[derive(Default)]
    struct RecordingReenqueuer {
        calls: Mutex<Vec<(TaskInvocation, Duration)>>,
        fail: bool,
    }

    impl RecordingReenqueuer {
        fn calls(&self) -> Vec<(TaskInvocation, Duration)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Reenqueuer for RecordingReenqueuer {
        async fn reenqueue(&self, invocation: &TaskInvocation, delay: Duration) -> Result<()> {
            if self.fail {
                return Err(JgError::Backend("queue unavailable".to_string()));
            }
            self.calls.lock().unwrap().push((invocation.clone(), delay));
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingMetrics {
        counts: Mutex<HashMap<String, usize>>,
    }

    impl CountingMetrics {
        fn count(&self, name: &str) -> usize {
            self.counts.lock().unwrap().get(name).copied().unwrap_or(0)
        }
    }

    impl Metrics for CountingMetrics {
        fn increment_counter(&self, name: &str) {
            *self.counts.lock().unwrap().entry(name.to_string()).or_default() += 1;
        }
    }

    #[derive(Default)]
    struct CountingTask {
        calls: AtomicUsize,
        run_for: Duration,
        error: Option<JobError>,
    }

    impl CountingTask {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskRunner for CountingTask {
        async fn perform_task(&self, _invocation: &TaskInvocation) -> JobResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.run_for.is_zero() {
                tokio::time::sleep(self.run_for).await;
            }
            match &self.error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl LeaseStore for BrokenStore {
        async fn try_acquire(&self, _: &str, _: &str, _: Duration) -> Result<LeaseAcquisition> {
            Err(JgError::Backend("connection refused".to_string()))
        }

        async fn remaining_ttl(&self, _: &str) -> Result<Option<Duration>> {
            Err(JgError::Backend("connection refused".to_string()))
        }

        async fn release(&self, _: &str, _: &str) -> Result<bool> {
            Err(JgError::Backend("connection refused".to_string()))
        }
    }

    struct BrokenHealth;

    #[async_trait]
    impl HealthSignal for BrokenHealth {
        async fn is_healthy(&self) -> Result<bool> {
            Err(JgError::Backend("replication query failed".to_string()))
        }
    }

    struct Harness {
        guard: ExecutionGuard,
        reenqueuer: Arc<RecordingReenqueuer>,
        metrics: Arc<CountingMetrics>,
        task: Arc<CountingTask>,
    }

    fn config() -> GuardConfig {
        GuardConfig::builder()
            .unhealthy_counter(COUNTER)
            .build()
            .unwrap()
    }

    fn harness_with(
        config: GuardConfig,
        store: DynLeaseStore,
        health: DynHealthSignal,
        task: CountingTask,
    ) -> Harness {
        let reenqueuer = Arc::new(RecordingReenqueuer::default());
        let metrics = Arc::new(CountingMetrics::default());
        let task = Arc::new(task);
        let guard = ExecutionGuard::builder()
            .config(config)
            .lease_store(store)
            .health(health)
            .reenqueuer(reenqueuer.clone())
            .task(task.clone())
            .metrics(metrics.clone())
            .build()
            .unwrap();
        Harness {
            guard,
            reenqueuer,
            metrics,
            task,
        }
    }

    fn harness(store: DynLeaseStore, health: DynHealthSignal) -> Harness {
        harness_with(config(), store, health, CountingTask::default())
    }

    #[test]
    fn test_lease_for_scopes_key_by_guard_and_task() {
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(HealthFlag::default()));
        let lease = h.guard.lease_for("BackgroundMigration");
        assert_eq!(lease.key(), "HealthCheckWorker:BackgroundMigration");
        assert_eq!(lease.ttl(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_holder_executes() {
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(HealthFlag::default()));

        let outcome = h.guard.perform("BackgroundMigration", vec![json!(1)]).await.unwrap();
        assert_eq!(outcome, PerformOutcome::Executed);
        assert_eq!(h.task.calls(), 1);
        assert!(h.reenqueuer.calls().is_empty());
        assert_eq!(h.metrics.count(COUNTER), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decision_reports_lease_ttl() {
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(HealthFlag::default()));

        let first = h.guard.perform_and_check_ttl("BackgroundMigration").await;
        assert_eq!(
            first,
            ExecutionDecision {
                should_perform: true,
                ttl: Some(Duration::from_secs(120))
            }
        );

        tokio::time::advance(Duration::from_secs(45)).await;
        let second = h.guard.perform_and_check_ttl("BackgroundMigration").await;
        assert_eq!(
            second,
            ExecutionDecision {
                should_perform: false,
                ttl: Some(Duration::from_secs(75))
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_performs_run_once() {
        let store: DynLeaseStore = Arc::new(MemoryLeaseStore::new());
        let slow = || CountingTask {
            run_for: Duration::from_secs(10),
            ..Default::default()
        };
        let a = harness_with(config(), store.clone(), Arc::new(HealthFlag::default()), slow());
        let b = harness_with(config(), store, Arc::new(HealthFlag::default()), slow());

        let (ra, rb) = tokio::join!(
            a.guard.perform("TaskA", vec![]),
            b.guard.perform("TaskA", vec![])
        );
        let outcomes = [ra.unwrap(), rb.unwrap()];

        let executed = outcomes
            .iter()
            .filter(|o| **o == PerformOutcome::Executed)
            .count();
        assert_eq!(executed, 1);
        assert!(outcomes.contains(&PerformOutcome::Deferred {
            delay: Duration::from_secs(120)
        }));
        assert_eq!(a.task.calls() + b.task.calls(), 1);

        let reenqueued: Vec<_> = a
            .reenqueuer
            .calls()
            .into_iter()
            .chain(b.reenqueuer.calls())
            .collect();
        assert_eq!(reenqueued.len(), 1);
        assert_eq!(reenqueued[0].0.task_class, "TaskA");
        assert_eq!(reenqueued[0].1, Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_waits_for_minimum_interval() {
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(HealthFlag::default()));

        assert_eq!(
            h.guard.perform("TaskA", vec![]).await.unwrap(),
            PerformOutcome::Executed
        );

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(
            h.guard.perform("TaskA", vec![]).await.unwrap(),
            PerformOutcome::Deferred {
                delay: Duration::from_secs(90)
            }
        );

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(
            h.guard.perform("TaskA", vec![]).await.unwrap(),
            PerformOutcome::Executed
        );
        assert_eq!(h.task.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_classes_do_not_block_each_other() {
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(HealthFlag::default()));
        assert_eq!(h.guard.perform("TaskA", vec![]).await.unwrap(), PerformOutcome::Executed);
        assert_eq!(h.guard.perform("TaskB", vec![]).await.unwrap(), PerformOutcome::Executed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_defers_for_minimum_interval() {
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(HealthFlag::new(false)));
        let args = vec![json!("users"), json!(7)];

        let outcome = h.guard.perform("BackgroundMigration", args.clone()).await.unwrap();

        assert_eq!(
            outcome,
            PerformOutcome::Deferred {
                delay: Duration::from_secs(120)
            }
        );
        assert_eq!(h.task.calls(), 0);
        assert_eq!(h.metrics.count(COUNTER), 1);

        let calls = h.reenqueuer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, TaskInvocation::new("BackgroundMigration", args));
        assert_eq!(calls[0].1, Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_deferral_while_unhealthy() {
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(HealthFlag::new(false)));

        for i in 1..=5 {
            let outcome = h.guard.perform("BackgroundMigration", vec![]).await.unwrap();
            assert!(matches!(outcome, PerformOutcome::Deferred { .. }));
            assert_eq!(h.reenqueuer.calls().len(), i);
            tokio::time::advance(Duration::from_secs(60)).await;
        }

        assert_eq!(h.task.calls(), 0);
        // Only the holder checks health: acquisitions at t=0, 120 and 240.
        assert_eq!(h.metrics.count(COUNTER), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_once_healthy() {
        let flag = HealthFlag::new(false);
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(flag.clone()));

        h.guard.perform("BackgroundMigration", vec![]).await.unwrap();
        flag.set(true);
        tokio::time::advance(Duration::from_secs(120)).await;

        assert_eq!(
            h.guard.perform("BackgroundMigration", vec![]).await.unwrap(),
            PerformOutcome::Executed
        );
        assert_eq!(h.metrics.count(COUNTER), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_error_defers_without_error() {
        let h = harness(Arc::new(BrokenStore), Arc::new(HealthFlag::default()));

        let outcome = h.guard.perform("BackgroundMigration", vec![]).await.unwrap();
        assert_eq!(
            outcome,
            PerformOutcome::Deferred {
                delay: Duration::from_secs(120)
            }
        );
        assert_eq!(h.task.calls(), 0);
        assert_eq!(h.metrics.count(COUNTER), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_error_counts_as_unhealthy() {
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(BrokenHealth));

        let outcome = h.guard.perform("BackgroundMigration", vec![]).await.unwrap();
        assert!(matches!(outcome, PerformOutcome::Deferred { .. }));
        assert_eq!(h.metrics.count(COUNTER), 1);
        assert_eq!(h.task.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_error_propagates() {
        let task = CountingTask {
            error: Some(JobError::fatal("column missing")),
            ..Default::default()
        };
        let h = harness_with(
            config(),
            Arc::new(MemoryLeaseStore::new()),
            Arc::new(HealthFlag::default()),
            task,
        );

        let err = h.guard.perform("BackgroundMigration", vec![]).await.unwrap_err();
        assert_eq!(err.as_task_error(), Some(&JobError::fatal("column missing")));
        assert!(h.reenqueuer.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reenqueue_error_propagates() {
        let reenqueuer = Arc::new(RecordingReenqueuer {
            fail: true,
            ..Default::default()
        });
        let guard = ExecutionGuard::builder()
            .config(config())
            .lease_store(Arc::new(MemoryLeaseStore::new()))
            .health(Arc::new(HealthFlag::new(false)))
            .reenqueuer(reenqueuer)
            .task(Arc::new(CountingTask::default()))
            .metrics(Arc::new(CountingMetrics::default()))
            .build()
            .unwrap();

        let err = guard.perform("BackgroundMigration", vec![]).await.unwrap_err();
        assert!(matches!(err, JgError::Backend(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_policy_bypasses_lease_and_health() {
        let config = GuardConfig::builder()
            .unhealthy_counter(COUNTER)
            .policy(SchedulingPolicy::Immediate)
            .build()
            .unwrap();
        let h = harness_with(
            config,
            Arc::new(BrokenStore),
            Arc::new(HealthFlag::new(false)),
            CountingTask::default(),
        );

        assert!(h.guard.always_perform());
        for _ in 0..3 {
            assert_eq!(
                h.guard.perform("BackgroundMigration", vec![]).await.unwrap(),
                PerformOutcome::Executed
            );
        }
        assert_eq!(h.task.calls(), 3);
        assert_eq!(h.metrics.count(COUNTER), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lease_attempts_are_decremented_then_abandoned() {
        let config = GuardConfig::builder()
            .unhealthy_counter(COUNTER)
            .max_lease_attempts(3)
            .build()
            .unwrap();
        let h = harness_with(
            config,
            Arc::new(MemoryLeaseStore::new()),
            Arc::new(HealthFlag::new(false)),
            CountingTask::default(),
        );

        let first = TaskInvocation::new("BackgroundMigration", vec![json!(1)]);
        h.guard.perform_invocation(&first).await.unwrap();
        let second = h.reenqueuer.calls()[0].0.clone();
        assert_eq!(second.lease_attempts, Some(2));

        h.guard.perform_invocation(&second).await.unwrap();
        let third = h.reenqueuer.calls()[1].0.clone();
        assert_eq!(third.lease_attempts, Some(1));
        assert_eq!(third.arguments, vec![json!(1)]);

        assert_eq!(
            h.guard.perform_invocation(&third).await.unwrap(),
            PerformOutcome::Abandoned
        );
        assert_eq!(h.reenqueuer.calls().len(), 2);
        assert_eq!(h.task.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_attempts_stay_unset() {
        let h = harness(Arc::new(MemoryLeaseStore::new()), Arc::new(HealthFlag::new(false)));
        h.guard.perform("BackgroundMigration", vec![]).await.unwrap();
        assert_eq!(h.reenqueuer.calls()[0].0.lease_attempts, None);
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let reenqueuer: Arc<dyn Reenqueuer> = Arc::new(RecordingReenqueuer::default());

        let err = ExecutionGuard::builder()
            .config(config())
            .lease_store(Arc::new(MemoryLeaseStore::new()))
            .health(Arc::new(HealthFlag::default()))
            .reenqueuer(reenqueuer.clone())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, JgError::NotImplemented("task body")));

        let err = ExecutionGuard::builder()
            .config(config())
            .health(Arc::new(HealthFlag::default()))
            .reenqueuer(reenqueuer.clone())
            .task(Arc::new(CountingTask::default()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, JgError::NotImplemented("lease store")));

        let err = ExecutionGuard::builder()
            .reenqueuer(reenqueuer)
            .task(Arc::new(CountingTask::default()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, JgError::NotImplemented("guard config")));
    }
}
