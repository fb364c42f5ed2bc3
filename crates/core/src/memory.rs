//! In-process implementations of the store, queue and artifact seams.
//!
//! Used by tests and by the single-process development mode of the API
//! (`BACKEND=memory`). Nothing here survives a restart.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::backend::{guarded_write, Delivery, JobQueue, JobStore, QueuedJob};
use crate::capability::{ArtifactStore, CapabilityError};
use crate::error::CoreError;
use crate::job::JobSnapshot;
use crate::types::{ArtifactRef, JobId};

/// Default time a delivery stays claimed before it is redelivered.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Job store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobSnapshot>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, snapshot: &JobSnapshot) -> Result<(), CoreError> {
        let mut jobs = self.jobs.write().await;
        if let Some(next) = guarded_write(jobs.get(&snapshot.id), snapshot) {
            jobs.insert(next.id, next);
        }
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<JobSnapshot>, CoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Job queue
// ---------------------------------------------------------------------------

struct InFlight {
    job: QueuedJob,
    attempt: u32,
    deadline: Instant,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<(QueuedJob, u32)>,
    in_flight: HashMap<JobId, InFlight>,
}

/// FIFO queue with lease-based redelivery.
pub struct MemoryJobQueue {
    state: Mutex<QueueState>,
    lease: Duration,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::with_lease(DEFAULT_LEASE)
    }

    pub fn with_lease(lease: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            lease,
        }
    }

    /// Jobs waiting for a worker (excludes claimed ones).
    pub async fn ready_len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    /// Jobs claimed but not yet acked.
    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: QueuedJob) -> Result<JobId, CoreError> {
        let id = job.id;
        self.state.lock().await.ready.push_back((job, 0));
        Ok(id)
    }

    async fn dequeue(&self) -> Result<Option<Delivery>, CoreError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        // Expired leases go back to the end of the line.
        let expired: Vec<JobId> = state
            .in_flight
            .iter()
            .filter(|(_, f)| f.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(f) = state.in_flight.remove(&id) {
                tracing::warn!(job_id = %id, attempt = f.attempt, "Lease expired, requeueing job");
                state.ready.push_back((f.job, f.attempt));
            }
        }

        let Some((job, previous_attempts)) = state.ready.pop_front() else {
            return Ok(None);
        };
        let attempt = previous_attempts + 1;
        state.in_flight.insert(
            job.id,
            InFlight {
                job: job.clone(),
                attempt,
                deadline: now + self.lease,
            },
        );
        Ok(Some(Delivery { job, attempt }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), CoreError> {
        self.state.lock().await.in_flight.remove(&delivery.job.id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Artifact store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.artifacts.read().await.len()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn persist(
        &self,
        id: JobId,
        extension: &str,
        bytes: &[u8],
    ) -> Result<ArtifactRef, CapabilityError> {
        let key = format!("{id}.{extension}");
        self.artifacts
            .write()
            .await
            .insert(key.clone(), bytes.to_vec());
        Ok(ArtifactRef::new(key))
    }

    async fn load(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, CapabilityError> {
        self.artifacts
            .read()
            .await
            .get(artifact.as_str())
            .cloned()
            .ok_or_else(|| CapabilityError::InvalidInput(format!("No artifact {artifact}")))
    }
}
