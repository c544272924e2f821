//! Redis-backed execution guard example.
//!
//! This example demonstrates:
//! - Declaring job class attributes and printing the queue manifest
//! - Two guards racing for the same task class through a shared Redis lease
//! - The health gate deferring work while the database is unhealthy
//! - Submitting an invocation to the ready queue
//!
//! Prerequisites:
//! - Redis server running on localhost:6379
//!
//! Run with: `cargo run -p demo-redis`

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use jg_core::{
    AttributeError, AttributeRegistry, Client, ClientConfig, DataConsistency, ExecutionGuard,
    FnTask, GuardConfig, HealthFlag, JobResult, PerformOutcome, ResourceBoundary,
    SchedulingMetadata, TaskInvocation, Urgency, WorkerAttributes,
};
use jg_redis::RedisBackend;

const NAMESPACE: &str = "jg-demo";

struct BackgroundMigrationWorker;

impl SchedulingMetadata for BackgroundMigrationWorker {
    const CLASS_NAME: &'static str = "BackgroundMigrationWorker";

    fn attributes() -> Result<WorkerAttributes, AttributeError> {
        let mut attrs = WorkerAttributes::new();
        attrs
            .set_feature_category("database")?
            .set_urgency(Urgency::Throttled)
            .set_data_consistency(DataConsistency::Always, None)?
            .set_worker_resource_boundary(ResourceBoundary::Cpu)
            .mark_idempotent()?;
        Ok(attrs)
    }
}

struct PipelineProcessWorker;

impl SchedulingMetadata for PipelineProcessWorker {
    const CLASS_NAME: &'static str = "PipelineProcessWorker";

    fn attributes() -> Result<WorkerAttributes, AttributeError> {
        let mut attrs = WorkerAttributes::new();
        attrs
            .set_feature_category("continuous_integration")?
            .set_urgency(Urgency::High)
            .set_queue_namespace("pipeline_processing");
        Ok(attrs)
    }
}

/// Pretend to migrate one batch of rows.
async fn copy_column(invocation: TaskInvocation) -> JobResult {
    println!(
        "[migration] {} args={:?}",
        invocation.task_class, invocation.arguments
    );
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("[migration] done\n");
    Ok(())
}

fn guard(
    backend: &RedisBackend,
    health: &HealthFlag,
    client: &Client,
) -> jg_core::Result<ExecutionGuard> {
    ExecutionGuard::builder()
        .config(
            GuardConfig::builder()
                .guard_name("BackgroundMigrationWorker")
                .minimum_interval(Duration::from_secs(10))
                .unhealthy_counter("background_migration_database_unhealthy_total")
                .build()?,
        )
        .lease_store(Arc::new(backend.clone()))
        .health(Arc::new(health.clone()))
        .reenqueuer(Arc::new(client.clone()))
        .task(Arc::new(FnTask::new(copy_column)))
        .build()
}

fn describe(outcome: PerformOutcome) -> String {
    match outcome {
        PerformOutcome::Executed => "executed".to_string(),
        PerformOutcome::Deferred { delay } => format!("deferred for {:?}", delay),
        PerformOutcome::Abandoned => "abandoned".to_string(),
    }
}

#[tokio::main]
async fn main() -> jg_core::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("jg Redis example\n");

    // Demo 1: Declarations
    println!("--- Demo 1: Job Class Manifest ---\n");

    let registry = AttributeRegistry::builder()
        .register::<BackgroundMigrationWorker>()
        .register::<PipelineProcessWorker>()
        .build()?;
    tracing::info!(classes = registry.len(), "Registry built");
    println!("{}\n", registry.manifest_json()?);

    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost".to_string());
    println!("Connecting to {}...", redis_url);

    let backend = match RedisBackend::new(&redis_url, NAMESPACE).await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            eprintln!("Make sure Redis is running: docker run -d -p 6379:6379 redis");
            return Err(e);
        }
    };
    println!("Connected\n");

    let client = Client::new(backend.clone(), ClientConfig::new(NAMESPACE));
    let health = HealthFlag::new(true);

    // Demo 2: Two workers race for the same task class
    println!("--- Demo 2: Single-Flight Execution ---\n");

    let first = guard(&backend, &health, &client)?;
    let second = guard(&backend, &health, &client)?;

    let (a, b) = tokio::join!(
        first.perform("CopyColumn", vec![json!("users"), json!(1)]),
        second.perform("CopyColumn", vec![json!("users"), json!(1)])
    );
    println!("worker 1: {}", describe(a?));
    println!("worker 2: {}\n", describe(b?));

    // Demo 3: Health gate
    println!("--- Demo 3: Unhealthy Database ---\n");

    health.set(false);
    let outcome = first
        .perform("BackfillNamespaces", vec![json!({"batch_size": 1000})])
        .await?;
    println!("worker 1: {}", describe(outcome));
    println!("scheduled jobs: {}\n", client.schedule_len().await?);

    // Demo 4: Submit fresh work for a worker loop to pick up
    println!("--- Demo 4: Enqueue ---\n");

    let job_id = client
        .enqueue(TaskInvocation::new("CopyColumn", vec![json!("projects"), json!(1)]))
        .await?;
    println!("enqueued {}", job_id);
    println!("queued jobs: {}\n", client.queue_len().await?);

    println!("Done");
    Ok(())
}
