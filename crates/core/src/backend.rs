//! Job store and job queue seams.
//!
//! The request layer and the workers share nothing but these two
//! abstractions. Implementations live in [`crate::memory`] (in-process)
//! and in `sepal-db` (Postgres).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::job::JobSnapshot;
use crate::record::FeatureRecord;
use crate::types::JobId;

/// Unit of work carried by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: JobId,
    pub input: FeatureRecord,
}

/// One hand-off of a [`QueuedJob`] to a worker.
///
/// `attempt` starts at 1 and grows on every redelivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub job: QueuedJob,
    pub attempt: u32,
}

/// Durable map from job id to the latest [`JobSnapshot`].
///
/// `put` is last-writer-wins keyed by id, with two guards every backend
/// applies (see [`guarded_write`]): once a terminal snapshot is stored,
/// later writes are ignored, and stored progress never decreases.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, snapshot: &JobSnapshot) -> Result<(), CoreError>;

    async fn get(&self, id: JobId) -> Result<Option<JobSnapshot>, CoreError>;

    /// Cheap reachability check used by health checks.
    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// At-least-once hand-off between submission and workers.
///
/// A delivery that is not acked within the backend's lease becomes
/// eligible for redelivery.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Make `job` available to workers. Never waits for execution.
    async fn enqueue(&self, job: QueuedJob) -> Result<JobId, CoreError>;

    /// Claim the next available job, if any. Never blocks waiting for one.
    async fn dequeue(&self) -> Result<Option<Delivery>, CoreError>;

    /// Mark a delivery as done so it is never redelivered.
    async fn ack(&self, delivery: &Delivery) -> Result<(), CoreError>;
}

/// Apply the store write guards to an incoming snapshot.
///
/// Returns the snapshot to store, or `None` when the write must be
/// dropped because `current` is already terminal.
pub fn guarded_write(current: Option<&JobSnapshot>, incoming: &JobSnapshot) -> Option<JobSnapshot> {
    match current {
        Some(existing) if existing.is_terminal() => None,
        Some(existing) => {
            let mut next = incoming.clone();
            next.progress = next.progress.max(existing.progress);
            Some(next)
        }
        None => Some(incoming.clone()),
    }
}
