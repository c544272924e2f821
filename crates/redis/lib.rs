//! Redis backend for jg.
//!
//! Provides a Redis lease store for [`ExecutionGuard`](jg_core::ExecutionGuard)
//! and a Redis queue backend the guard's client re-enqueues deferred jobs into.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jg_redis::RedisBackend;
//! use jg_core::{Client, ClientConfig, DynLeaseStore};
//!
//! #[tokio::main]
//! async fn main() -> jg_core::Result<()> {
//!     let backend = RedisBackend::new("redis://localhost", "maintenance").await?;
//!     let leases: DynLeaseStore = Arc::new(backend.clone());
//!     let client = Client::new(backend, ClientConfig::new("maintenance"));
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use jg_core::{Backend, JgError, LeaseAcquisition, LeaseStore, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Manages Redis keys with a namespace prefix.
#[derive(Debug, Clone)]
pub struct RedisKeys {
    namespace: String,
}

/// Table prefix for all jg-created keys.
const JG_TABLE_PREFIX: &str = "_jg_tb_";

impl RedisKeys {
    /// Create a new RedisKeys instance with the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Get the namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key for the main jobs queue (LIST).
    pub fn jobs(&self) -> String {
        format!("{}{}:jobs", JG_TABLE_PREFIX, self.namespace)
    }

    /// Key for the scheduled jobs sorted set (ZSET).
    pub fn schedule(&self) -> String {
        format!("{}{}:schedule", JG_TABLE_PREFIX, self.namespace)
    }

    /// Key for an execution lease (STRING holding the holder token).
    pub fn lease(&self, key: &str) -> String {
        format!("{}{}:lease:{}", JG_TABLE_PREFIX, self.namespace, key)
    }
}

/// SET NX PX, falling back to PTTL of the current holder, in one round trip.
const ACQUIRE_SCRIPT: &str = r#"
if redis.call('SET', KEYS[1], ARGV[1], 'NX', 'PX', ARGV[2]) then
    return {1, 0}
end
return {0, redis.call('PTTL', KEYS[1])}
"#;

/// Delete the lease only while it still holds the caller's token.
const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Map a PTTL reply to a remaining duration. Negative replies mean the key
/// is gone (-2) or has no expiry (-1).
fn pttl_to_duration(pttl: i64) -> Option<Duration> {
    if pttl > 0 {
        Some(Duration::from_millis(pttl as u64))
    } else {
        None
    }
}

fn acquisition_from_reply(acquired: i64, pttl: i64) -> LeaseAcquisition {
    if acquired == 1 {
        LeaseAcquisition::Acquired
    } else {
        LeaseAcquisition::Held {
            remaining: pttl_to_duration(pttl),
        }
    }
}

/// Redis backend for queue storage and execution leases.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    keys: RedisKeys,
}

impl RedisBackend {
    /// Create a new Redis backend. `namespace` scopes the lease keys.
    pub async fn new(redis_url: &str, namespace: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| JgError::Backend(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| JgError::Backend(e.to_string()))?;
        let keys = RedisKeys::new(namespace);
        Ok(Self { conn, keys })
    }

    /// Create a new Redis backend with an existing connection manager.
    pub fn with_connection(conn: ConnectionManager, namespace: &str) -> Self {
        Self {
            conn,
            keys: RedisKeys::new(namespace),
        }
    }

    /// Get the Redis keys manager.
    pub fn keys(&self) -> &RedisKeys {
        &self.keys
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn push_job(&self, ns: &str, job_json: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(RedisKeys::new(ns).jobs(), job_json)
            .await
            .map_err(|e| JgError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn queue_len(&self, ns: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .llen(RedisKeys::new(ns).jobs())
            .await
            .map_err(|e| JgError::Backend(e.to_string()))?;
        Ok(len)
    }

    async fn schedule_job(&self, ns: &str, job_json: &str, run_at: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(RedisKeys::new(ns).schedule(), job_json, run_at)
            .await
            .map_err(|e| JgError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn schedule_len(&self, ns: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .zcard(RedisKeys::new(ns).schedule())
            .await
            .map_err(|e| JgError::Backend(e.to_string()))?;
        Ok(len)
    }
}

#[async_trait]
impl LeaseStore for RedisBackend {
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<LeaseAcquisition> {
        let mut conn = self.conn.clone();
        let ttl_ms = ttl.as_millis().max(1) as u64;

        let script = redis::Script::new(ACQUIRE_SCRIPT);
        let (acquired, pttl): (i64, i64) = script
            .key(self.keys.lease(key))
            .arg(token)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| JgError::Backend(e.to_string()))?;

        let acquisition = acquisition_from_reply(acquired, pttl);
        tracing::debug!(lease_key = %key, acquired = acquisition.is_acquired(), "Lease attempt");
        Ok(acquisition)
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        let pttl: i64 = conn
            .pttl(self.keys.lease(key))
            .await
            .map_err(|e| JgError::Backend(e.to_string()))?;
        Ok(pttl_to_duration(pttl))
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool> {
        let mut conn = self.conn.clone();

        let script = redis::Script::new(RELEASE_SCRIPT);
        let deleted: i64 = script
            .key(self.keys.lease(key))
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| JgError::Backend(e.to_string()))?;

        Ok(deleted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_keys() {
        let keys = RedisKeys::new("myapp");
        assert_eq!(keys.jobs(), "_jg_tb_myapp:jobs");
        assert_eq!(keys.schedule(), "_jg_tb_myapp:schedule");
        assert_eq!(
            keys.lease("HealthCheckWorker:BackgroundMigration"),
            "_jg_tb_myapp:lease:HealthCheckWorker:BackgroundMigration"
        );
    }

    #[test]
    fn test_redis_keys_complex_namespace() {
        let keys = RedisKeys::new("app:v2:queue");
        assert_eq!(keys.namespace(), "app:v2:queue");
        assert_eq!(keys.jobs(), "_jg_tb_app:v2:queue:jobs");
        assert_eq!(keys.lease("k"), "_jg_tb_app:v2:queue:lease:k");
    }

    #[test]
    fn test_pttl_to_duration() {
        assert_eq!(pttl_to_duration(119_500), Some(Duration::from_millis(119_500)));
        assert_eq!(pttl_to_duration(-1), None);
        assert_eq!(pttl_to_duration(-2), None);
        assert_eq!(pttl_to_duration(0), None);
    }

    #[test]
    fn test_acquisition_from_reply() {
        assert_eq!(acquisition_from_reply(1, 0), LeaseAcquisition::Acquired);
        assert_eq!(
            acquisition_from_reply(0, 5_000),
            LeaseAcquisition::Held {
                remaining: Some(Duration::from_secs(5))
            }
        );
        assert_eq!(
            acquisition_from_reply(0, -2),
            LeaseAcquisition::Held { remaining: None }
        );
    }
}

// ========== Integration Tests (require Redis) ==========
