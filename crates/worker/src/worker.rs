//! Queue polling loop.
//!
//! Each tick drains the queue: deliveries are executed one at a time until
//! the queue reports nothing available. A delivery is acked only after the
//! runner has left the job terminal in the store; otherwise it stays
//! claimed and the queue redelivers it once the lease expires.

use std::sync::Arc;
use std::time::Duration;

use sepal_core::backend::JobQueue;
use sepal_core::error::CoreError;
use sepal_pipeline::JobRunner;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default polling interval when the queue is empty.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A single worker loop. Several may share one queue and runner.
pub struct Worker {
    name: String,
    queue: Arc<dyn JobQueue>,
    runner: Arc<JobRunner>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(queue: Arc<dyn JobQueue>, runner: Arc<JobRunner>) -> Self {
        Self {
            name: "worker-0".into(),
            queue,
            runner,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the loop until the cancellation token is triggered.
    ///
    /// A job already executing when cancellation arrives runs to
    /// completion; no further deliveries are claimed after that.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            worker = %self.name,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(worker = %self.name, "Worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.drain(&cancel).await {
                        tracing::error!(worker = %self.name, error = %e, "Queue poll failed");
                    }
                }
            }
        }
    }

    /// Execute deliveries until the queue is empty or shutdown starts.
    async fn drain(&self, cancel: &CancellationToken) -> Result<usize, CoreError> {
        let mut processed = 0;
        while !cancel.is_cancelled() && self.run_once().await? {
            processed += 1;
        }
        if processed > 0 {
            tracing::debug!(worker = %self.name, processed, "Queue drained");
        }
        Ok(processed)
    }

    /// Claim and execute at most one delivery.
    ///
    /// Returns `false` when the queue had nothing available.
    pub async fn run_once(&self) -> Result<bool, CoreError> {
        let Some(delivery) = self.queue.dequeue().await? else {
            return Ok(false);
        };

        tracing::info!(
            worker = %self.name,
            job_id = %delivery.job.id,
            attempt = delivery.attempt,
            "Job claimed",
        );

        match self.runner.execute(&delivery).await {
            Ok(snapshot) => {
                self.queue.ack(&delivery).await?;
                tracing::debug!(
                    worker = %self.name,
                    job_id = %delivery.job.id,
                    state = %snapshot.state,
                    "Delivery acked",
                );
            }
            Err(e) => {
                tracing::error!(
                    worker = %self.name,
                    job_id = %delivery.job.id,
                    attempt = delivery.attempt,
                    error = %e,
                    "Job execution interrupted, leaving for redelivery",
                );
            }
        }
        Ok(true)
    }
}

/// Spawn `count` worker loops on the current runtime.
pub fn spawn_workers(
    count: usize,
    queue: Arc<dyn JobQueue>,
    runner: Arc<JobRunner>,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|i| {
            let worker = Worker::new(Arc::clone(&queue), Arc::clone(&runner))
                .with_name(format!("worker-{i}"))
                .with_poll_interval(poll_interval);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        })
        .collect()
}
