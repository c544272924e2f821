//! Outbound metrics seam.

use std::sync::Arc;

/// Counter sink used by the guard.
pub trait Metrics: Send + Sync {
    fn increment_counter(&self, name: &str);
}

/// A type-erased metrics sink that can be shared across threads.
pub type DynMetrics = Arc<dyn Metrics>;

/// Forwards to the process-wide `metrics` recorder.
///
/// Without an installed recorder the increments are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalMetrics;

impl Metrics for GlobalMetrics {
    fn increment_counter(&self, name: &str) {
        metrics::counter!(name.to_string()).increment(1);
    }
}
