use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sepal_core::backend::{JobQueue, JobStore};
use sepal_core::capability::ArtifactStore;
use sepal_core::handle::JobHandle;
use sepal_core::memory::{MemoryJobQueue, MemoryJobStore};
use sepal_db::{DbPool, PgJobQueue, PgJobStore};
use sepal_pipeline::{JobRunner, LocalArtifactStore};
use sepal_worker::config::{load_predictor, load_report_writer};
use sepal_worker::signal::shutdown_signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sepal_api::config::{Backend, ServerConfig};
use sepal_api::router::build_app_router;
use sepal_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sepal_api=debug,sepal_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.backend,
        embedded_workers = config.embedded_workers,
        "Loaded server configuration",
    );

    // --- Job store and queue ---
    let lease = Duration::from_secs(config.lease_secs);
    let (store, queue, pool): (Arc<dyn JobStore>, Arc<dyn JobQueue>, Option<DbPool>) =
        match config.backend {
            Backend::Memory => {
                tracing::warn!("Using in-memory job backend; jobs do not survive a restart");
                (
                    Arc::new(MemoryJobStore::new()),
                    Arc::new(MemoryJobQueue::with_lease(lease)),
                    None,
                )
            }
            Backend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .expect("DATABASE_URL must be set when BACKEND=postgres");

                let pool = sepal_db::create_pool(database_url)
                    .await
                    .expect("Failed to connect to database");
                tracing::info!("Database connection pool created");

                sepal_db::health_check(&pool)
                    .await
                    .expect("Database health check failed");
                sepal_db::run_migrations(&pool)
                    .await
                    .expect("Failed to run database migrations");
                tracing::info!("Database migrations applied");

                (
                    Arc::new(PgJobStore::new(pool.clone())),
                    Arc::new(PgJobQueue::with_lease(pool.clone(), lease)),
                    Some(pool),
                )
            }
        };
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(LocalArtifactStore::new(&config.artifact_dir));

    // --- Embedded workers ---
    let worker_cancel = CancellationToken::new();
    let worker_handles = if config.embedded_workers > 0 {
        let predictor =
            load_predictor(config.model_path.as_deref()).expect("Failed to load model");
        let runner = Arc::new(JobRunner::new(
            Arc::clone(&store),
            Arc::clone(&artifacts),
            predictor,
            load_report_writer(config.report_format),
        ));
        sepal_worker::spawn_workers(
            config.embedded_workers,
            Arc::clone(&queue),
            runner,
            Duration::from_millis(config.poll_interval_ms),
            worker_cancel.clone(),
        )
    } else {
        if config.backend == Backend::Memory {
            tracing::warn!("No embedded workers with the memory backend; jobs will stay PENDING");
        }
        Vec::new()
    };

    // --- App state ---
    let state = AppState {
        jobs: JobHandle::new(store, queue, artifacts),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    worker_cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    for handle in worker_handles {
        if tokio::time::timeout(drain, handle).await.is_err() {
            tracing::warn!("Embedded worker did not stop in time");
        }
    }

    if let Some(pool) = pool {
        pool.close().await;
    }

    tracing::info!("Graceful shutdown complete");
}
