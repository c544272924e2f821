//! PostgreSQL backend for jg.
//!
//! Provides a PostgreSQL lease store, a queue backend for re-enqueued jobs,
//! and [`ReplicationSlotHealth`], a health signal based on replication slot
//! lag.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jg_postgres::{PostgresBackend, ReplicationSlotHealth};
//! use jg_core::{Client, ClientConfig, DynHealthSignal, DynLeaseStore};
//!
//! #[tokio::main]
//! async fn main() -> jg_core::Result<()> {
//!     let backend = PostgresBackend::new("postgres://localhost/mydb", "maintenance").await?;
//!     let leases: DynLeaseStore = Arc::new(backend.clone());
//!     let health: DynHealthSignal = Arc::new(ReplicationSlotHealth::new(backend.pool().clone()));
//!     let client = Client::new(backend, ClientConfig::new("maintenance"));
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use jg_core::{Backend, HealthSignal, JgError, LeaseAcquisition, LeaseStore, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Lag at which a physical replication slot counts as too far behind.
pub const DEFAULT_MAX_LAG_BYTES: i64 = 100 * 1024 * 1024;

/// Table names are interpolated into SQL, so namespaces are restricted to
/// ASCII letters, digits and underscores.
fn validate_namespace(ns: &str) -> Result<()> {
    let valid = !ns.is_empty()
        && ns.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !ns.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(JgError::Config(format!("Invalid namespace for PostgreSQL: {:?}", ns)))
    }
}

fn jobs_table(ns: &str) -> String {
    format!("{}_jobs", ns)
}

fn scheduled_table(ns: &str) -> String {
    format!("{}_scheduled", ns)
}

fn leases_table(ns: &str) -> String {
    format!("{}_leases", ns)
}

fn millis_to_duration(ms: Option<i64>) -> Option<Duration> {
    match ms {
        Some(ms) if ms > 0 => Some(Duration::from_millis(ms as u64)),
        _ => None,
    }
}

/// PostgreSQL backend for queue storage and execution leases.
#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
    namespace: String,
}

impl PostgresBackend {
    /// Create a new PostgreSQL backend. `namespace` scopes the lease table.
    pub async fn new(database_url: &str, namespace: &str) -> Result<Self> {
        validate_namespace(namespace)?;

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| JgError::Backend(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Self::with_pool(pool, namespace).await
    }

    /// Create a backend on an existing pool.
    pub async fn with_pool(pool: PgPool, namespace: &str) -> Result<Self> {
        validate_namespace(namespace)?;
        let backend = Self {
            pool,
            namespace: namespace.to_string(),
        };
        backend.init_namespace(namespace).await?;
        Ok(backend)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create the tables for `ns` if they do not exist yet.
    pub async fn init_namespace(&self, ns: &str) -> Result<()> {
        validate_namespace(ns)?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                job_json TEXT NOT NULL,
                created_at TIMESTAMPTZ DEFAULT NOW()
            )
            "#,
            jobs_table(ns)
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| JgError::Backend(format!("Failed to create jobs table: {}", e)))?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                job_json TEXT NOT NULL,
                run_at BIGINT NOT NULL,
                created_at TIMESTAMPTZ DEFAULT NOW()
            )
            "#,
            scheduled_table(ns)
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| JgError::Backend(format!("Failed to create scheduled table: {}", e)))?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_run_at ON {} (run_at)",
            ns,
            scheduled_table(ns)
        ))
        .execute(&self.pool)
        .await
        .ok();

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                lease_key TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
            leases_table(ns)
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| JgError::Backend(format!("Failed to create leases table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    async fn push_job(&self, ns: &str, job_json: &str) -> Result<()> {
        validate_namespace(ns)?;
        sqlx::query(&format!(
            "INSERT INTO {} (job_json) VALUES ($1)",
            jobs_table(ns)
        ))
        .bind(job_json)
        .execute(&self.pool)
        .await
        .map_err(|e| JgError::Backend(format!("Failed to push job: {}", e)))?;
        Ok(())
    }

    async fn queue_len(&self, ns: &str) -> Result<usize> {
        validate_namespace(ns)?;
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", jobs_table(ns)))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| JgError::Backend(format!("Failed to get queue length: {}", e)))?;
        Ok(row.0 as usize)
    }

    async fn schedule_job(&self, ns: &str, job_json: &str, run_at: i64) -> Result<()> {
        validate_namespace(ns)?;
        sqlx::query(&format!(
            "INSERT INTO {} (job_json, run_at) VALUES ($1, $2)",
            scheduled_table(ns)
        ))
        .bind(job_json)
        .bind(run_at)
        .execute(&self.pool)
        .await
        .map_err(|e| JgError::Backend(format!("Failed to schedule job: {}", e)))?;
        Ok(())
    }

    async fn schedule_len(&self, ns: &str) -> Result<usize> {
        validate_namespace(ns)?;
        let row: (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", scheduled_table(ns)))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| JgError::Backend(format!("Failed to get schedule length: {}", e)))?;
        Ok(row.0 as usize)
    }
}

#[async_trait]
impl LeaseStore for PostgresBackend {
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<LeaseAcquisition> {
        let table = leases_table(&self.namespace);

        // Takes over the row only once it has expired, judged by the database clock.
        let acquired: Option<(String,)> = sqlx::query_as(&format!(
            r#"
            INSERT INTO {table} (lease_key, token, expires_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3))
            ON CONFLICT (lease_key) DO UPDATE
                SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
                WHERE {table}.expires_at <= NOW()
            RETURNING token
            "#,
            table = table
        ))
        .bind(key)
        .bind(token)
        .bind(ttl.as_secs_f64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| JgError::Backend(format!("Failed to acquire lease: {}", e)))?;

        if acquired.is_some() {
            tracing::debug!(lease_key = %key, "Lease acquired");
            return Ok(LeaseAcquisition::Acquired);
        }

        Ok(LeaseAcquisition::Held {
            remaining: self.remaining_ttl(key).await?,
        })
    }

    async fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        let row: Option<(Option<i64>,)> = sqlx::query_as(&format!(
            r#"
            SELECT (EXTRACT(EPOCH FROM (expires_at - NOW())) * 1000)::BIGINT
            FROM {} WHERE lease_key = $1 AND expires_at > NOW()
            "#,
            leases_table(&self.namespace)
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| JgError::Backend(format!("Failed to read lease TTL: {}", e)))?;

        Ok(millis_to_duration(row.and_then(|(ms,)| ms)))
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE lease_key = $1 AND token = $2 AND expires_at > NOW()",
            leases_table(&self.namespace)
        ))
        .bind(key)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| JgError::Backend(format!("Failed to release lease: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }
}

/// Health signal that trips when physical replication slots fall behind.
///
/// Unhealthy when at least one slot lags by `max_lag_bytes` or more and
/// those slots make up at least half of all physical slots. No slots at all
/// is healthy.
#[derive(Clone)]
pub struct ReplicationSlotHealth {
    pool: PgPool,
    max_lag_bytes: i64,
}

impl ReplicationSlotHealth {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            max_lag_bytes: DEFAULT_MAX_LAG_BYTES,
        }
    }

    pub fn with_max_lag_bytes(mut self, max_lag_bytes: i64) -> Self {
        self.max_lag_bytes = max_lag_bytes;
        self
    }

    pub fn max_lag_bytes(&self) -> i64 {
        self.max_lag_bytes
    }

    /// Lag in bytes of every physical slot. `None` for slots without a
    /// restart LSN.
    pub async fn slot_lags(&self) -> Result<Vec<Option<i64>>> {
        let rows: Vec<(Option<i64>,)> = sqlx::query_as(
            r#"
            SELECT pg_wal_lsn_diff(pg_current_wal_insert_lsn(), restart_lsn)::BIGINT
            FROM pg_replication_slots
            WHERE slot_type = 'physical'
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| JgError::Backend(format!("Failed to read replication slots: {}", e)))?;

        Ok(rows.into_iter().map(|(lag,)| lag).collect())
    }
}

fn slots_too_far_behind(lags: &[Option<i64>], max_lag_bytes: i64) -> bool {
    if lags.is_empty() {
        return false;
    }
    let too_great = lags
        .iter()
        .filter(|lag| matches!(lag, Some(lag) if *lag >= max_lag_bytes))
        .count();
    too_great > 0 && too_great as f64 >= lags.len() as f64 / 2.0
}

#[async_trait]
impl HealthSignal for ReplicationSlotHealth {
    async fn is_healthy(&self) -> Result<bool> {
        let lags = self.slot_lags().await?;
        let unhealthy = slots_too_far_behind(&lags, self.max_lag_bytes);
        if unhealthy {
            tracing::debug!(slots = lags.len(), "Replication slots lagging");
        }
        Ok(!unhealthy)
    }
}


// ========== Integration Tests (require PostgreSQL) ==========
