//! Named, time-bounded leases held in a shared store.
//!
//! A lease serializes a task class across every worker that shares the
//! store. It is never released by the guard: it decays after its TTL, which
//! also spaces successive runs of the same class.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{JgError, Result};

/// Result of a single acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseAcquisition {
    /// The caller now holds the lease for its full TTL.
    Acquired,
    /// Someone else holds it. `remaining` is the store's view of its TTL.
    Held { remaining: Option<Duration> },
}

impl LeaseAcquisition {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }
}

/// Shared store with atomic acquire-if-absent-with-expiry semantics.
///
/// Implementations must be safe to call from many processes at once; a
/// process-local lock alone is not enough for the Redis or SQL stores.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Try once to take `key` for `ttl`, recording `token` as the holder.
    ///
    /// Must not wait on contention.
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<LeaseAcquisition>;

    /// Remaining TTL of `key`, or `None` when absent or without expiry.
    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Delete `key` if `token` still holds it. Returns whether it was deleted.
    async fn release(&self, key: &str, token: &str) -> Result<bool>;
}

/// A type-erased lease store that can be shared across threads.
pub type DynLeaseStore = Arc<dyn LeaseStore>;

/// A lease on one key. Constructing it does not acquire anything.
#[derive(Clone)]
pub struct Lease {
    store: DynLeaseStore,
    key: String,
    ttl: Duration,
    token: String,
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .field("token", &self.token)
            .finish()
    }
}

impl Lease {
    /// Create a lease with a fresh random holder token.
    pub fn new(store: DynLeaseStore, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            ttl,
            token: Uuid::new_v4().to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// One round trip to the store.
    pub async fn try_obtain(&self) -> Result<LeaseAcquisition> {
        self.store.try_acquire(&self.key, &self.token, self.ttl).await
    }

    pub async fn remaining_ttl(&self) -> Result<Option<Duration>> {
        self.store.remaining_ttl(&self.key).await
    }

    /// Release the lease if this holder still owns it.
    pub async fn cancel(&self) -> Result<bool> {
        self.store.release(&self.key, &self.token).await
    }
}

#[derive(Debug)]
struct Entry {
    token: String,
    expires_at: Instant,
}

/// Process-local lease store.
///
/// Expiry follows tokio's clock, so paused-time tests can advance it.
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| JgError::Backend("lease store lock poisoned".to_string()))
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<LeaseAcquisition> {
        let now = Instant::now();
        let mut entries = self.lock()?;

        if let Some(entry) = entries.get(key) {
            if entry.expires_at > now {
                return Ok(LeaseAcquisition::Held {
                    remaining: Some(entry.expires_at - now),
                });
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                token: token.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(LeaseAcquisition::Acquired)
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        let entries = self.lock()?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.expires_at - now))
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        match entries.get(key) {
            Some(entry) if entry.token == token && entry.expires_at > now => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
