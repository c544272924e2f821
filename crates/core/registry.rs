//! Start-up registry of job class attributes.
//!
//! Classes are declared through [`RegistryBuilder`]; any declaration error
//! surfaces from `build` and is meant to stop the process. The built
//! [`AttributeRegistry`] is read-only and safe to share across threads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::attributes::{
    DataConsistency, ResourceBoundary, Urgency, WorkerAttributes, NOT_OWNED,
};
use crate::error::{AttributeError, Result};

/// A job class that declares its own scheduling metadata.
pub trait SchedulingMetadata {
    /// Name the class is registered and enqueued under.
    const CLASS_NAME: &'static str;

    /// Build this class's attributes. Errors abort registry construction.
    fn attributes() -> std::result::Result<WorkerAttributes, AttributeError>;
}

/// Collects declarations before freezing them into an [`AttributeRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<String, WorkerAttributes>,
    first_error: Option<AttributeError>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class implementing [`SchedulingMetadata`].
    pub fn register<W: SchedulingMetadata>(self) -> Self {
        match W::attributes() {
            Ok(attrs) => self.register_attrs(W::CLASS_NAME, attrs),
            Err(err) => self.fail(err),
        }
    }

    /// Register pre-built attributes under a class name.
    pub fn register_attrs(mut self, name: impl Into<String>, attrs: WorkerAttributes) -> Self {
        let name = name.into();
        if self.first_error.is_some() {
            return self;
        }
        if let Err(err) = attrs.validate_invariants() {
            return self.fail(err);
        }
        if self.entries.contains_key(&name) {
            return self.fail(AttributeError::DuplicateRegistration(name));
        }
        debug!(task_class = %name, "Registered job class");
        self.entries.insert(name, attrs);
        self
    }

    /// Register every entry of a JSON manifest.
    pub fn load_manifest(mut self, json: &str) -> Result<Self> {
        let entries: Vec<ManifestEntry> = serde_json::from_str(json)?;
        for entry in entries {
            let attrs = entry.to_attributes()?;
            self = self.register_attrs(entry.name, attrs);
        }
        Ok(self)
    }

    fn fail(mut self, err: AttributeError) -> Self {
        if self.first_error.is_none() {
            self.first_error = Some(err);
        }
        self
    }

    /// Freeze the registry, returning the first declaration error if any.
    pub fn build(self) -> Result<AttributeRegistry> {
        if let Some(err) = self.first_error {
            return Err(err.into());
        }
        Ok(AttributeRegistry {
            entries: self.entries,
        })
    }
}

/// Immutable map from job class name to its attributes.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    entries: HashMap<String, WorkerAttributes>,
}

impl AttributeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&WorkerAttributes> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WorkerAttributes)> {
        self.entries.iter().map(|(name, attrs)| (name.as_str(), attrs))
    }

    /// Resolved attributes of every class, sorted by name.
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        let mut entries: Vec<ManifestEntry> = self
            .iter()
            .map(|(name, attrs)| ManifestEntry::from_attributes(name, attrs))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// The manifest as pretty-printed JSON.
    pub fn manifest_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.manifest())?)
    }
}

/// Serializable view of one class's resolved attributes.
///
/// Enumerated values travel as lowercase names so a manifest can be edited
/// by hand and loaded back with [`RegistryBuilder::load_manifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(default)]
    pub feature_category: Option<String>,
    #[serde(default = "default_urgency")]
    pub urgency: String,
    #[serde(default = "default_data_consistency")]
    pub data_consistency: String,
    #[serde(default)]
    pub data_consistency_feature_flag: Option<String>,
    #[serde(default)]
    pub max_replica_retry_count: Option<u32>,
    #[serde(default)]
    pub has_external_dependencies: bool,
    #[serde(default = "default_resource_boundary")]
    pub resource_boundary: String,
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub queue_namespace: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deduplication_strategy: Option<String>,
    #[serde(default)]
    pub deduplication_options: BTreeMap<String, Value>,
    #[serde(default)]
    pub big_payload: bool,
}

fn default_urgency() -> String {
    Urgency::default().to_string()
}

fn default_data_consistency() -> String {
    DataConsistency::default().to_string()
}

fn default_resource_boundary() -> String {
    ResourceBoundary::default().to_string()
}

impl ManifestEntry {
    fn from_attributes(name: &str, attrs: &WorkerAttributes) -> Self {
        Self {
            name: name.to_string(),
            feature_category: attrs.feature_category().map(|c| c.as_str().to_string()),
            urgency: attrs.urgency().to_string(),
            data_consistency: attrs.data_consistency().to_string(),
            data_consistency_feature_flag: attrs.data_consistency_feature_flag().map(str::to_string),
            max_replica_retry_count: Some(attrs.max_replica_retry_count()),
            has_external_dependencies: attrs.has_external_dependencies(),
            resource_boundary: attrs.resource_boundary().to_string(),
            idempotent: attrs.is_idempotent(),
            weight: Some(attrs.weight()),
            queue_namespace: attrs.queue_namespace().map(str::to_string),
            tags: attrs.tags().to_vec(),
            deduplication_strategy: Some(attrs.deduplication_strategy().to_string()),
            deduplication_options: attrs.deduplication_options().clone(),
            big_payload: attrs.is_big_payload(),
        }
    }

    /// Rebuild attributes through the validating setters.
    pub fn to_attributes(&self) -> std::result::Result<WorkerAttributes, AttributeError> {
        let mut attrs = WorkerAttributes::new();

        match self.feature_category.as_deref() {
            Some(NOT_OWNED) => {
                attrs.set_feature_category_not_owned()?;
            }
            Some(category) => {
                attrs.set_feature_category(category)?;
            }
            None => {}
        }

        attrs.set_urgency(self.urgency.parse()?);
        attrs.set_data_consistency(
            self.data_consistency.parse()?,
            self.data_consistency_feature_flag.as_deref(),
        )?;
        attrs.set_worker_resource_boundary(self.resource_boundary.parse()?);

        if let Some(count) = self.max_replica_retry_count {
            attrs.set_max_replica_retry_count(count);
        }
        if self.has_external_dependencies {
            attrs.mark_has_external_dependencies();
        }
        if self.idempotent {
            attrs.mark_idempotent()?;
        }
        if let Some(weight) = self.weight {
            attrs.set_weight(weight);
        }
        if let Some(namespace) = &self.queue_namespace {
            attrs.set_queue_namespace(namespace.clone());
        }
        if !self.tags.is_empty() {
            attrs.set_tags(self.tags.iter().cloned());
        }
        if let Some(strategy) = &self.deduplication_strategy {
            attrs.set_deduplicate(strategy.clone(), self.deduplication_options.clone());
        }
        if self.big_payload {
            attrs.mark_big_payload();
        }

        Ok(attrs)
    }
}
