//! Per-job-class scheduling attributes.
//!
//! A [`WorkerAttributes`] value is declared once per job class at start-up and
//! read by the queue to route, prioritise, or reject jobs. Setters validate
//! as they go, so a bad declaration fails while the registry is being built
//! rather than when a job runs.
//!
//! ```rust
//! use jg_core::{DataConsistency, Urgency, WorkerAttributes};
//!
//! # fn main() -> Result<(), jg_core::AttributeError> {
//! let mut attrs = WorkerAttributes::new();
//! attrs
//!     .set_feature_category("continuous_integration")?
//!     .set_urgency(Urgency::High)
//!     .set_data_consistency(DataConsistency::Always, None)?
//!     .mark_idempotent()?;
//!
//! assert_eq!(attrs.urgency(), Urgency::High);
//! assert!(attrs.is_idempotent());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AttributeError;

/// Sentinel category for cross-cutting infrastructure workers.
pub const NOT_OWNED: &str = "not_owned";

/// Strategy used when a class never calls `set_deduplicate`.
pub const DEFAULT_DEDUPLICATION_STRATEGY: &str = "until_executing";

/// Weight used when neither an explicit weight nor a namespace weight applies.
pub const DEFAULT_WEIGHT: u32 = 1;

/// Replica retries allowed before falling back to the primary.
pub const DEFAULT_MAX_REPLICA_RETRY_COUNT: u32 = 1;

/// Default weights keyed by queue namespace.
pub const NAMESPACE_WEIGHTS: &[(&str, u32)] = &[
    ("auto_devops", 2),
    ("auto_merge", 3),
    ("chaos", 2),
    ("deployment", 3),
    ("mail_scheduler", 2),
    ("notifications", 2),
    ("pipeline_cache", 3),
    ("pipeline_creation", 4),
    ("pipeline_default", 3),
    ("pipeline_hooks", 2),
    ("pipeline_processing", 5),
    ("epics", 2),
    ("incident_management", 2),
    ("security_scans", 2),
];

/// Look up the default weight for a queue namespace.
pub fn namespace_weight(namespace: &str) -> Option<u32> {
    NAMESPACE_WEIGHTS
        .iter()
        .find(|(name, _)| *name == namespace)
        .map(|(_, weight)| *weight)
}

/// Scheduling priority hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Latency-sensitive work.
    High,
    /// Normal background work.
    #[default]
    Low,
    /// Work the queue may hold back under load.
    Throttled,
}

impl Urgency {
    /// Lowercase name of the urgency.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
            Self::Throttled => "throttled",
        }
    }
}

impl FromStr for Urgency {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            "throttled" => Ok(Self::Throttled),
            other => Err(AttributeError::InvalidUrgency(other.to_string())),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How tolerant a job is of reading from a lagging replica.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataConsistency {
    /// Must read from the primary.
    #[default]
    Always,
    /// Prefers the same replica across retries.
    Sticky,
    /// Tolerates stale reads.
    Delayed,
}

impl DataConsistency {
    /// Lowercase name of the consistency mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Sticky => "sticky",
            Self::Delayed => "delayed",
        }
    }
}

impl FromStr for DataConsistency {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "sticky" => Ok(Self::Sticky),
            "delayed" => Ok(Self::Delayed),
            other => Err(AttributeError::InvalidDataConsistency(other.to_string())),
        }
    }
}

impl fmt::Display for DataConsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a job is mostly memory- or CPU-bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceBoundary {
    Memory,
    Cpu,
    #[default]
    Unknown,
}

impl ResourceBoundary {
    /// Lowercase name of the boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Cpu => "cpu",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for ResourceBoundary {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "cpu" => Ok(Self::Cpu),
            "unknown" => Ok(Self::Unknown),
            other => Err(AttributeError::InvalidResourceBoundary(other.to_string())),
        }
    }
}

impl fmt::Display for ResourceBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owning feature category of a job class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureCategory {
    /// Owned by a named feature category.
    Owned(String),
    /// Deliberately outside any category.
    NotOwned,
}

impl FeatureCategory {
    /// Category name, or [`NOT_OWNED`] for the sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Owned(name) => name,
            Self::NotOwned => NOT_OWNED,
        }
    }
}

/// Feature flag lookup used to gate the data consistency mode.
pub trait FeatureFlags {
    /// Whether the named flag is enabled.
    fn enabled(&self, name: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
struct Declared {
    feature_category: bool,
    data_consistency: bool,
}

/// Scheduling metadata for one job class.
///
/// Unset attributes resolve to documented defaults through the getters.
#[derive(Debug, Clone, Default)]
pub struct WorkerAttributes {
    feature_category: Option<FeatureCategory>,
    urgency: Option<Urgency>,
    data_consistency: Option<DataConsistency>,
    data_consistency_feature_flag: Option<String>,
    max_replica_retry_count: Option<u32>,
    external_dependencies: bool,
    resource_boundary: Option<ResourceBoundary>,
    idempotent: bool,
    weight: Option<u32>,
    queue_namespace: Option<String>,
    tags: Vec<String>,
    deduplication_strategy: Option<String>,
    deduplication_options: BTreeMap<String, Value>,
    big_payload: bool,
    declared: Declared,
}

impl WorkerAttributes {
    /// Create an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a declaration from a parent class's attributes.
    ///
    /// Every parent value is inherited and may be overridden; declare-once
    /// checks only consider declarations made on the child.
    pub fn inherit(parent: &WorkerAttributes) -> Self {
        Self {
            declared: Declared::default(),
            ..parent.clone()
        }
    }

    // ========== Declarations ==========

    /// Declare the owning feature category.
    pub fn set_feature_category(
        &mut self,
        value: impl Into<String>,
    ) -> Result<&mut Self, AttributeError> {
        let value = value.into();
        if value == NOT_OWNED {
            return Err(AttributeError::InvalidCategory);
        }
        self.declare_feature_category(FeatureCategory::Owned(value))
    }

    /// Mark the class as intentionally outside any feature category.
    pub fn set_feature_category_not_owned(&mut self) -> Result<&mut Self, AttributeError> {
        self.declare_feature_category(FeatureCategory::NotOwned)
    }

    fn declare_feature_category(
        &mut self,
        category: FeatureCategory,
    ) -> Result<&mut Self, AttributeError> {
        if self.declared.feature_category {
            return Err(AttributeError::AlreadySet("feature_category"));
        }
        self.feature_category = Some(category);
        self.declared.feature_category = true;
        Ok(self)
    }

    /// Declare the urgency.
    pub fn set_urgency(&mut self, value: Urgency) -> &mut Self {
        self.urgency = Some(value);
        self
    }

    /// Declare the data consistency mode, optionally gated by a feature flag.
    ///
    /// May be called once per class. The idempotency invariant is checked
    /// against the new value.
    pub fn set_data_consistency(
        &mut self,
        value: DataConsistency,
        feature_flag: Option<&str>,
    ) -> Result<&mut Self, AttributeError> {
        if self.declared.data_consistency {
            return Err(AttributeError::AlreadySet("data_consistency"));
        }

        let previous = self.data_consistency;
        self.data_consistency = Some(value);
        if let Err(err) = self.validate_invariants() {
            self.data_consistency = previous;
            return Err(err);
        }

        self.data_consistency_feature_flag = feature_flag.map(str::to_string);
        self.declared.data_consistency = true;
        Ok(self)
    }

    /// Declare how many replica retries are allowed.
    pub fn set_max_replica_retry_count(&mut self, value: u32) -> &mut Self {
        self.max_replica_retry_count = Some(value);
        self
    }

    /// Declare the resource boundary.
    pub fn set_worker_resource_boundary(&mut self, value: ResourceBoundary) -> &mut Self {
        self.resource_boundary = Some(value);
        self
    }

    /// Mark the class as idempotent. Checked against the current consistency.
    pub fn mark_idempotent(&mut self) -> Result<&mut Self, AttributeError> {
        let previous = self.idempotent;
        self.idempotent = true;
        if let Err(err) = self.validate_invariants() {
            self.idempotent = previous;
            return Err(err);
        }
        Ok(self)
    }

    /// Declare an explicit weight.
    pub fn set_weight(&mut self, value: u32) -> &mut Self {
        self.weight = Some(value);
        self
    }

    /// Declare the queue namespace used for default weight resolution.
    pub fn set_queue_namespace(&mut self, value: impl Into<String>) -> &mut Self {
        self.queue_namespace = Some(value.into());
        self
    }

    /// Replace the tag list.
    pub fn set_tags<I, S>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = values.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the deduplication strategy and its options.
    pub fn set_deduplicate(
        &mut self,
        strategy: impl Into<String>,
        options: BTreeMap<String, Value>,
    ) -> &mut Self {
        self.deduplication_strategy = Some(strategy.into());
        self.deduplication_options = options;
        self
    }

    /// Mark the class as carrying large argument payloads.
    pub fn mark_big_payload(&mut self) -> &mut Self {
        self.big_payload = true;
        self
    }

    /// Mark the class as calling external services.
    pub fn mark_has_external_dependencies(&mut self) -> &mut Self {
        self.external_dependencies = true;
        self
    }

    /// Check combinations of attributes that are not allowed together.
    pub fn validate_invariants(&self) -> Result<(), AttributeError> {
        if self.is_idempotent() && self.data_consistency() != DataConsistency::Always {
            return Err(AttributeError::InvariantViolation(
                "idempotent jobs require Always consistency".to_string(),
            ));
        }
        Ok(())
    }

    // ========== Reads ==========

    pub fn feature_category(&self) -> Option<&FeatureCategory> {
        self.feature_category.as_ref()
    }

    pub fn is_feature_category_not_owned(&self) -> bool {
        matches!(self.feature_category, Some(FeatureCategory::NotOwned))
    }

    pub fn urgency(&self) -> Urgency {
        self.urgency.unwrap_or_default()
    }

    pub fn data_consistency(&self) -> DataConsistency {
        self.data_consistency.unwrap_or_default()
    }

    pub fn data_consistency_feature_flag(&self) -> Option<&str> {
        self.data_consistency_feature_flag.as_deref()
    }

    /// Whether the declared consistency mode should be honoured.
    ///
    /// Classes without a gating flag are always enabled.
    pub fn data_consistency_enabled(&self, flags: &dyn FeatureFlags) -> bool {
        match self.data_consistency_feature_flag() {
            Some(flag) => flags.enabled(flag),
            None => true,
        }
    }

    pub fn is_data_consistency_delayed(&self) -> bool {
        self.data_consistency() == DataConsistency::Delayed
    }

    /// True when the job may be routed to a replica.
    pub fn utilizes_load_balancing_capabilities(&self) -> bool {
        matches!(
            self.data_consistency(),
            DataConsistency::Sticky | DataConsistency::Delayed
        )
    }

    pub fn max_replica_retry_count(&self) -> u32 {
        self.max_replica_retry_count
            .unwrap_or(DEFAULT_MAX_REPLICA_RETRY_COUNT)
    }

    pub fn has_external_dependencies(&self) -> bool {
        self.external_dependencies
    }

    pub fn resource_boundary(&self) -> ResourceBoundary {
        self.resource_boundary.unwrap_or_default()
    }

    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    /// Explicit weight, else the namespace default, else [`DEFAULT_WEIGHT`].
    pub fn weight(&self) -> u32 {
        self.weight
            .or_else(|| self.queue_namespace().and_then(namespace_weight))
            .unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn queue_namespace(&self) -> Option<&str> {
        self.queue_namespace.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn deduplication_strategy(&self) -> &str {
        self.deduplication_strategy
            .as_deref()
            .unwrap_or(DEFAULT_DEDUPLICATION_STRATEGY)
    }

    pub fn deduplication_options(&self) -> &BTreeMap<String, Value> {
        &self.deduplication_options
    }

    pub fn is_big_payload(&self) -> bool {
        self.big_payload
    }
}
