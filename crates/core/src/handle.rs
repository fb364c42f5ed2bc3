//! The job handle: what the request layer uses to submit, poll and
//! retrieve.
//!
//! Submission and polling never wait on a worker. Retrieval is the one
//! blocking call; it re-reads the store until the job is terminal or the
//! caller's timeout runs out.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::backend::{JobQueue, JobStore, QueuedJob};
use crate::capability::ArtifactStore;
use crate::error::CoreError;
use crate::job::{JobError, JobSnapshot, JobState};
use crate::record::FeatureRecord;
use crate::status::JobStatusView;
use crate::types::{ArtifactRef, JobId};

/// Default interval between store reads while waiting for a result.
pub const DEFAULT_RESULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of [`JobHandle::retrieve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// The job succeeded; here is its artifact.
    Ready(Artifact),
    /// The timeout elapsed before the job reached a terminal state.
    NotReady(JobStatusView),
    /// The job failed; there is no artifact.
    Failed(JobError),
}

/// A loaded artifact and the reference it was stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub reference: ArtifactRef,
    pub bytes: Vec<u8>,
}

/// Submission, polling and retrieval over a shared store and queue.
#[derive(Clone)]
pub struct JobHandle {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
    artifacts: Arc<dyn ArtifactStore>,
    poll_interval: Duration,
}

impl JobHandle {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn JobQueue>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            store,
            queue,
            artifacts,
            poll_interval: DEFAULT_RESULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Issue an id, record the job as `PENDING` and enqueue it.
    ///
    /// The store entry is written before the enqueue so a worker never sees
    /// a job the store does not know about.
    pub async fn submit(&self, input: FeatureRecord) -> Result<JobId, CoreError> {
        let id = JobId::generate();
        let field_count = input.len();

        self.store
            .put(&JobSnapshot::pending(id, input.clone()))
            .await?;
        self.queue.enqueue(QueuedJob { id, input }).await?;

        tracing::info!(job_id = %id, field_count, "Job submitted");
        Ok(id)
    }

    /// Full stored snapshot of a job.
    pub async fn snapshot(&self, id: JobId) -> Result<JobSnapshot, CoreError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| CoreError::UnknownJob(id.to_string()))
    }

    /// Non-blocking progress poll. Unknown ids are an error, never a state.
    pub async fn status(&self, id: JobId) -> Result<JobStatusView, CoreError> {
        let job = self.snapshot(id).await?;
        Ok(JobStatusView::from(&job))
    }

    /// Wait up to `timeout` for the job to finish and return its outcome.
    pub async fn retrieve(&self, id: JobId, timeout: Duration) -> Result<Retrieval, CoreError> {
        let deadline = Instant::now() + timeout;

        loop {
            let job = self.snapshot(id).await?;
            match job.state {
                JobState::Succeeded => {
                    let reference = job.result.ok_or_else(|| {
                        CoreError::Internal(format!("Job {id} succeeded without a result"))
                    })?;
                    let bytes = self
                        .artifacts
                        .load(&reference)
                        .await
                        .map_err(CoreError::backend)?;
                    return Ok(Retrieval::Ready(Artifact { reference, bytes }));
                }
                JobState::Failed => {
                    let error = job.error.ok_or_else(|| {
                        CoreError::Internal(format!("Job {id} failed without an error"))
                    })?;
                    return Ok(Retrieval::Failed(error));
                }
                JobState::Pending | JobState::Running => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Retrieval::NotReady(JobStatusView::from(&job)));
                    }
                    tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FailureKind, Phase};
    use crate::memory::{MemoryArtifactStore, MemoryJobQueue, MemoryJobStore};
    use assert_matches::assert_matches;

    struct Fixture {
        handle: JobHandle,
        store: Arc<MemoryJobStore>,
        queue: Arc<MemoryJobQueue>,
        artifacts: Arc<MemoryArtifactStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryJobStore::new());
        let queue = Arc::new(MemoryJobQueue::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let handle = JobHandle::new(store.clone(), queue.clone(), artifacts.clone())
            .with_poll_interval(Duration::from_millis(10));
        Fixture {
            handle,
            store,
            queue,
            artifacts,
        }
    }

    fn record() -> FeatureRecord {
        FeatureRecord::new().with("Sepal length", "4.6")
    }

    #[tokio::test]
    async fn submit_records_pending_and_enqueues() {
        let f = fixture();
        let id = f.handle.submit(record()).await.unwrap();

        let status = f.handle.status(id).await.unwrap();
        assert_eq!(status.state, JobState::Pending);
        assert_eq!(status.progress, 0.0);
        assert_eq!(f.queue.ready_len().await, 1);

        let delivery = f.queue.dequeue().await.unwrap().unwrap();
        assert_eq!(delivery.job.id, id);
        assert_eq!(delivery.job.input, record());
    }

    #[tokio::test]
    async fn unknown_id_is_distinct_from_pending() {
        let f = fixture();
        assert_matches!(
            f.handle.status(JobId::generate()).await,
            Err(CoreError::UnknownJob(_))
        );
        assert_matches!(
            f.handle
                .retrieve(JobId::generate(), Duration::from_millis(1))
                .await,
            Err(CoreError::UnknownJob(_))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retrieve_times_out_while_pending() {
        let f = fixture();
        let id = f.handle.submit(record()).await.unwrap();

        let outcome = f.handle.retrieve(id, Duration::from_secs(2)).await.unwrap();
        assert_matches!(outcome, Retrieval::NotReady(view) if view.state == JobState::Pending);
    }

    #[tokio::test]
    async fn retrieve_waits_for_success() {
        let f = fixture();
        let id = f.handle.submit(record()).await.unwrap();

        let store = f.store.clone();
        let artifacts = f.artifacts.clone();
        let worker = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let mut job = store.get(id).await.unwrap().unwrap();
            job.enter(Phase::Finalizing).unwrap();
            let reference = artifacts.persist(id, "txt", b"report").await.unwrap();
            job.succeed(reference).unwrap();
            store.put(&job).await.unwrap();
        });

        let outcome = f.handle.retrieve(id, Duration::from_secs(5)).await.unwrap();
        worker.await.unwrap();

        let artifact = assert_matches!(outcome, Retrieval::Ready(a) => a);
        assert_eq!(artifact.bytes, b"report");
        assert_eq!(artifact.reference.as_str(), format!("{id}.txt"));
    }

    #[tokio::test]
    async fn retrieve_reports_failure() {
        let f = fixture();
        let id = f.handle.submit(record()).await.unwrap();

        let mut job = f.store.get(id).await.unwrap().unwrap();
        job.enter(Phase::Validating).unwrap();
        job.fail(JobError::new(FailureKind::InvalidInput, "missing"))
            .unwrap();
        f.store.put(&job).await.unwrap();

        let outcome = f.handle.retrieve(id, Duration::from_secs(1)).await.unwrap();
        assert_matches!(outcome, Retrieval::Failed(e) if e.kind == FailureKind::InvalidInput);
    }
}
