//! Configuration types for guards and the re-enqueue client.

use std::time::Duration;

use crate::error::{JgError, Result};

/// Default spacing between two runs of the same task class.
pub const DEFAULT_MINIMUM_INTERVAL: Duration = Duration::from_secs(120);

/// How a guard decides whether to run a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulingPolicy {
    /// Take the lease and check health before running.
    #[default]
    LeaseGated,
    /// Run every invocation at once. For synchronous test harnesses only.
    Immediate,
}

/// Configuration for the Client (re-enqueuer).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Namespace prefix for keys/tables.
    pub namespace: String,
}

impl ClientConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("jg")
    }
}

/// Configuration for an [`ExecutionGuard`](crate::ExecutionGuard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Guard identity, used as the lease key prefix.
    pub guard_name: String,
    /// Lease TTL and fallback re-enqueue delay.
    pub minimum_interval: Duration,
    /// Counter incremented each time the health gate defers a job.
    pub unhealthy_counter: String,
    /// Deferrals allowed per job before it is abandoned. `None` is unbounded.
    pub max_lease_attempts: Option<u32>,
    pub policy: SchedulingPolicy,
}

impl GuardConfig {
    pub fn builder() -> GuardConfigBuilder {
        GuardConfigBuilder::new()
    }
}

/// Builder for GuardConfig.
#[derive(Debug, Clone)]
pub struct GuardConfigBuilder {
    guard_name: String,
    minimum_interval: Duration,
    unhealthy_counter: Option<String>,
    max_lease_attempts: Option<u32>,
    policy: SchedulingPolicy,
}

impl Default for GuardConfigBuilder {
    fn default() -> Self {
        Self {
            guard_name: "HealthCheckWorker".to_string(),
            minimum_interval: DEFAULT_MINIMUM_INTERVAL,
            unhealthy_counter: None,
            max_lease_attempts: None,
            policy: SchedulingPolicy::default(),
        }
    }
}

impl GuardConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the guard name.
    pub fn guard_name(mut self, name: impl Into<String>) -> Self {
        self.guard_name = name.into();
        self
    }

    /// Set the minimum interval between runs.
    pub fn minimum_interval(mut self, interval: Duration) -> Self {
        self.minimum_interval = interval;
        self
    }

    /// Set the unhealthy counter name.
    pub fn unhealthy_counter(mut self, name: impl Into<String>) -> Self {
        self.unhealthy_counter = Some(name.into());
        self
    }

    /// Bound the number of deferrals per job.
    pub fn max_lease_attempts(mut self, attempts: u32) -> Self {
        self.max_lease_attempts = Some(attempts);
        self
    }

    /// Set the scheduling policy.
    pub fn policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the GuardConfig.
    pub fn build(self) -> Result<GuardConfig> {
        let unhealthy_counter = self
            .unhealthy_counter
            .filter(|name| !name.is_empty())
            .ok_or(JgError::NotImplemented("unhealthy counter"))?;

        if self.guard_name.is_empty() {
            return Err(JgError::Config("guard name must not be empty".to_string()));
        }
        if self.minimum_interval.is_zero() {
            return Err(JgError::Config(
                "minimum interval must be greater than zero".to_string(),
            ));
        }
        if self.max_lease_attempts == Some(0) {
            return Err(JgError::Config(
                "max lease attempts must be greater than zero".to_string(),
            ));
        }

        Ok(GuardConfig {
            guard_name: self.guard_name,
            minimum_interval: self.minimum_interval,
            unhealthy_counter,
            max_lease_attempts: self.max_lease_attempts,
            policy: self.policy,
        })
    }
}
