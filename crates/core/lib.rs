//! # jg-core - Job class attributes and guarded execution
//!
//! This crate provides the core abstractions for the jg scheduling primitives:
//! - `WorkerAttributes` and `AttributeRegistry` for per-class scheduling metadata
//! - `LeaseStore` trait and `Lease` for fleet-wide mutual exclusion
//! - `ExecutionGuard` for lease-gated, health-aware task execution
//! - `Backend` trait and `Client` for re-enqueueing deferred jobs
//! - `HealthSignal` and `Metrics` seams
//! - Error types

mod attributes;
mod backend;
mod client;
mod config;
mod error;
mod guard;
mod health;
mod job;
mod lease;
mod telemetry;
mod registry;
mod worker;

// Re-export main types
pub use attributes::{
    namespace_weight, DataConsistency, FeatureCategory, FeatureFlags, ResourceBoundary, Urgency,
    WorkerAttributes, DEFAULT_DEDUPLICATION_STRATEGY, DEFAULT_MAX_REPLICA_RETRY_COUNT,
    DEFAULT_WEIGHT, NAMESPACE_WEIGHTS, NOT_OWNED,
};
pub use backend::{Backend, DynBackend, SharedBackend};
pub use client::{Client, Reenqueuer};
pub use config::{
    ClientConfig, GuardConfig, GuardConfigBuilder, SchedulingPolicy, DEFAULT_MINIMUM_INTERVAL,
};
pub use error::{AttributeError, JgError, Result};
pub use guard::{ExecutionDecision, ExecutionGuard, ExecutionGuardBuilder, PerformOutcome};
pub use health::{DynHealthSignal, HealthFlag, HealthSignal};
pub use job::{Job, JobId, JobStatus, TaskInvocation};
pub use lease::{DynLeaseStore, Lease, LeaseAcquisition, LeaseStore, MemoryLeaseStore};
pub use telemetry::{DynMetrics, GlobalMetrics, Metrics};
pub use registry::{AttributeRegistry, ManifestEntry, RegistryBuilder, SchedulingMetadata};
pub use worker::{FnTask, JobError, JobResult, TaskRunner};
