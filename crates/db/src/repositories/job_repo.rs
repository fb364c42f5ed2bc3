//! Repository for the `jobs` table.
//!
//! Uses `JobStatus` from `models::status` for every status literal.

use sepal_core::job::JobSnapshot;
use sepal_core::types::JobId;
use sqlx::PgPool;

use crate::models::job::JobRow;
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, status_id, phase, progress, input, result, \
    error_kind, error_detail, attempts, created_at, updated_at";

/// Provides snapshot reads and guarded writes for jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert or overwrite the snapshot for `job.id`.
    ///
    /// The stored `input` is never changed after the first insert. A row
    /// already in a terminal status is left untouched, and progress only
    /// moves forward. Returns `true` if a row was written.
    pub async fn upsert(pool: &PgPool, job: &JobSnapshot) -> Result<bool, sqlx::Error> {
        let input = serde_json::to_string(&job.input)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let status = JobStatus::from(job.state);
        let attempts = i32::try_from(job.attempts).unwrap_or(i32::MAX);

        let result = sqlx::query(
            "INSERT INTO jobs \
                 (id, status_id, phase, progress, input, result, \
                  error_kind, error_detail, attempts, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (id) DO UPDATE SET \
                 status_id = EXCLUDED.status_id, \
                 phase = EXCLUDED.phase, \
                 progress = GREATEST(jobs.progress, EXCLUDED.progress), \
                 result = EXCLUDED.result, \
                 error_kind = EXCLUDED.error_kind, \
                 error_detail = EXCLUDED.error_detail, \
                 attempts = EXCLUDED.attempts, \
                 updated_at = EXCLUDED.updated_at \
             WHERE jobs.status_id NOT IN ($12, $13)",
        )
        .bind(job.id.as_uuid())
        .bind(status.id())
        .bind(job.phase.map(|p| p.as_str()))
        .bind(job.progress)
        .bind(input)
        .bind(job.result.as_ref().map(|r| r.as_str()))
        .bind(job.error.as_ref().map(|e| e.kind.as_str()))
        .bind(job.error.as_ref().map(|e| e.detail.as_str()))
        .bind(attempts)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(JobStatus::Succeeded.id())
        .bind(JobStatus::Failed.id())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(pool)
            .await
    }
}
