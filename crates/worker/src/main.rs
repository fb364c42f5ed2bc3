use std::sync::Arc;
use std::time::Duration;

use sepal_db::{PgJobQueue, PgJobStore};
use sepal_pipeline::{JobRunner, LocalArtifactStore};
use sepal_worker::config::{load_predictor, load_report_writer, WorkerConfig};
use sepal_worker::signal::shutdown_signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long to wait for in-flight jobs once shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sepal_worker=debug,sepal_pipeline=debug,sepal_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        concurrency = config.concurrency,
        lease_secs = config.lease.as_secs(),
        artifact_dir = %config.artifact_dir.display(),
        report_format = ?config.report_format,
        "Loaded worker configuration",
    );

    // --- Database ---
    let pool = sepal_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    sepal_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    sepal_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Capabilities ---
    let predictor = load_predictor(config.model_path.as_deref()).expect("Failed to load model");
    let store = Arc::new(PgJobStore::new(pool.clone()));
    let queue = Arc::new(PgJobQueue::with_lease(pool.clone(), config.lease));
    let runner = Arc::new(JobRunner::new(
        store,
        Arc::new(LocalArtifactStore::new(&config.artifact_dir)),
        predictor,
        load_report_writer(config.report_format),
    ));

    // --- Workers ---
    let cancel = CancellationToken::new();
    let handles = sepal_worker::spawn_workers(
        config.concurrency,
        queue,
        runner,
        config.poll_interval,
        cancel.clone(),
    );

    shutdown_signal().await;
    cancel.cancel();

    for handle in handles {
        if tokio::time::timeout(DRAIN_TIMEOUT, handle).await.is_err() {
            tracing::warn!("Worker did not stop in time, abandoning in-flight job to redelivery");
        }
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}
