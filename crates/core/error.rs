//! Error types for the jg scheduling primitives.

use thiserror::Error;

use crate::worker::JobError;

/// Declaration-time errors raised while building a job class's attributes.
///
/// These indicate a programming mistake in a worker declaration and are
/// expected to abort start-up. They are never produced at perform time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// `not_owned` passed to the regular category setter.
    #[error("Invalid category: use `set_feature_category_not_owned` to mark a worker as not owned")]
    InvalidCategory,

    /// Urgency name outside {high, low, throttled}.
    #[error("Invalid urgency: {0}")]
    InvalidUrgency(String),

    /// Data consistency name outside {always, sticky, delayed}.
    #[error("Invalid data consistency: {0}")]
    InvalidDataConsistency(String),

    /// Resource boundary name outside {memory, cpu, unknown}.
    #[error("Invalid resource boundary: {0}")]
    InvalidResourceBoundary(String),

    /// A declare-once attribute was declared a second time on the same class.
    #[error("Attribute already set: {0}")]
    AlreadySet(&'static str),

    /// Attributes combine into an unsupported configuration.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Two registrations under the same job class name.
    #[error("Job class already registered: {0}")]
    DuplicateRegistration(String),
}

/// The main error type for the jg crates.
#[derive(Error, Debug)]
pub enum JgError {
    /// Worker declaration error.
    #[error("Attribute error: {0}")]
    Attribute(#[from] AttributeError),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error returned by the task body, passed through unchanged.
    #[error("Task error: {0}")]
    Task(JobError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required collaborator was not supplied when assembling a guard.
    #[error("Not implemented: {0} must be supplied")]
    NotImplemented(&'static str),

    /// Backend-specific error.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl JgError {
    /// The task body's error, if this is one.
    pub fn as_task_error(&self) -> Option<&JobError> {
        match self {
            Self::Task(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias using JgError.
pub type Result<T> = std::result::Result<T, JgError>;
