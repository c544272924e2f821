//! Health signal consulted before a guarded task runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;

/// Black-box health oracle, e.g. "is replication lag acceptable".
///
/// An `Err` is treated by the guard the same as unhealthy.
#[async_trait]
pub trait HealthSignal: Send + Sync {
    async fn is_healthy(&self) -> Result<bool>;
}

/// A type-erased health signal that can be shared across threads.
pub type DynHealthSignal = Arc<dyn HealthSignal>;

/// Health signal backed by a shared flag.
///
/// Clones share the same flag, so a test or an operator endpoint can flip
/// it while guards are running.
#[derive(Debug, Clone)]
pub struct HealthFlag {
    healthy: Arc<AtomicBool>,
}

impl HealthFlag {
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy: Arc::new(AtomicBool::new(healthy)),
        }
    }

    pub fn set(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

impl Default for HealthFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl HealthSignal for HealthFlag {
    async fn is_healthy(&self) -> Result<bool> {
        Ok(self.get())
    }
}
