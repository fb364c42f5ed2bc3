//! [`JobStore`] and [`JobQueue`] over Postgres.

use std::time::Duration;

use async_trait::async_trait;
use sepal_core::backend::{Delivery, JobQueue, JobStore, QueuedJob};
use sepal_core::error::CoreError;
use sepal_core::job::JobSnapshot;
use sepal_core::types::JobId;

use crate::repositories::{JobRepo, QueueRepo};
use crate::DbPool;

/// Default lease for a claimed queue row.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(300);

/// Job store backed by the `jobs` table.
#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn put(&self, snapshot: &JobSnapshot) -> Result<(), CoreError> {
        let written = JobRepo::upsert(&self.pool, snapshot)
            .await
            .map_err(CoreError::backend)?;
        if !written {
            tracing::debug!(job_id = %snapshot.id, "Ignored write to terminal job");
        }
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<JobSnapshot>, CoreError> {
        JobRepo::find_by_id(&self.pool, id)
            .await
            .map_err(CoreError::backend)?
            .map(JobSnapshot::try_from)
            .transpose()
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(CoreError::backend)
    }
}

/// Job queue backed by the `job_queue` table.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: DbPool,
    lease: Duration,
}

impl PgJobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self::with_lease(pool, DEFAULT_LEASE)
    }

    pub fn with_lease(pool: DbPool, lease: Duration) -> Self {
        Self { pool, lease }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: QueuedJob) -> Result<JobId, CoreError> {
        QueueRepo::enqueue(&self.pool, &job)
            .await
            .map_err(CoreError::backend)?;
        Ok(job.id)
    }

    async fn dequeue(&self) -> Result<Option<Delivery>, CoreError> {
        QueueRepo::claim_next(&self.pool, self.lease)
            .await
            .map_err(CoreError::backend)?
            .map(Delivery::try_from)
            .transpose()
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), CoreError> {
        QueueRepo::ack(&self.pool, delivery.job.id)
            .await
            .map_err(CoreError::backend)
    }
}
