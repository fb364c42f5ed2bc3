//! Repository for the `job_queue` table.
//!
//! Claims use `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
//! receive the same row while its lease is live.

use std::time::Duration;

use sepal_core::backend::QueuedJob;
use sepal_core::types::JobId;
use sqlx::PgPool;

use crate::models::job::QueueRow;

/// Provides enqueue / claim / ack operations for the delivery queue.
pub struct QueueRepo;

impl QueueRepo {
    /// Add a job to the queue. Re-enqueueing an id makes it available again.
    pub async fn enqueue(pool: &PgPool, job: &QueuedJob) -> Result<(), sqlx::Error> {
        let payload = serde_json::to_string(&job.input)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query(
            "INSERT INTO job_queue (job_id, payload) VALUES ($1, $2) \
             ON CONFLICT (job_id) DO UPDATE SET \
                 payload = EXCLUDED.payload, \
                 enqueued_at = NOW(), \
                 claimed_at = NULL, \
                 lease_expires_at = NULL, \
                 acked_at = NULL",
        )
        .bind(job.id.as_uuid())
        .bind(payload)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Atomically claim the oldest available row for `lease`.
    ///
    /// A row is available when it is not acked and its lease (if any) has
    /// expired, so a crashed worker's job is picked up again.
    pub async fn claim_next(
        pool: &PgPool,
        lease: Duration,
    ) -> Result<Option<QueueRow>, sqlx::Error> {
        sqlx::query_as::<_, QueueRow>(
            "UPDATE job_queue \
             SET claimed_at = NOW(), \
                 lease_expires_at = NOW() + make_interval(secs => $1), \
                 attempts = attempts + 1 \
             WHERE job_id = ( \
                 SELECT job_id FROM job_queue \
                 WHERE acked_at IS NULL \
                   AND (lease_expires_at IS NULL OR lease_expires_at <= NOW()) \
                 ORDER BY enqueued_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING job_id, payload, attempts",
        )
        .bind(lease.as_secs_f64())
        .fetch_optional(pool)
        .await
    }

    /// Mark a job's delivery as done.
    pub async fn ack(pool: &PgPool, job_id: JobId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE job_queue SET acked_at = NOW() WHERE job_id = $1")
            .bind(job_id.as_uuid())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Number of rows not yet acked.
    pub async fn outstanding(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM job_queue WHERE acked_at IS NULL")
            .fetch_one(pool)
            .await
    }
}
