//! Executes one job delivery through every phase.
//!
//! Each phase transition is written to the job store before the phase's
//! work starts, so pollers observe progress while the job runs. A phase
//! failure ends the job as `FAILED` with a reason code. Errors from the
//! store itself are returned instead, leaving the delivery unacked so the
//! queue redelivers it.
//!
//! Execution is idempotent: a delivery for a job that is already terminal
//! does nothing, and re-running a partially executed job starts again at
//! validation and overwrites the artifact under the same key.

use std::sync::Arc;

use sepal_core::backend::{Delivery, JobStore};
use sepal_core::capability::{ArtifactStore, Predictor, ReportWriter};
use sepal_core::error::CoreError;
use sepal_core::job::{FailureKind, JobError, JobSnapshot, Phase};
use sepal_core::validation::{feature_vector, missing_fields};

/// Owns the shared capabilities and applies them to deliveries.
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    artifacts: Arc<dyn ArtifactStore>,
    predictor: Arc<dyn Predictor>,
    writer: Arc<dyn ReportWriter>,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        artifacts: Arc<dyn ArtifactStore>,
        predictor: Arc<dyn Predictor>,
        writer: Arc<dyn ReportWriter>,
    ) -> Self {
        Self {
            store,
            artifacts,
            predictor,
            writer,
        }
    }

    /// Run `delivery` to a terminal state and return the final snapshot.
    ///
    /// `Ok` means the job is terminal in the store (this call finished it,
    /// or an earlier delivery already had). `Err` means the store could not
    /// be read or written and the job must be retried.
    pub async fn execute(&self, delivery: &Delivery) -> Result<JobSnapshot, CoreError> {
        let job = &delivery.job;

        let mut snapshot = match self.store.get(job.id).await? {
            Some(existing) if existing.is_terminal() => {
                tracing::info!(
                    job_id = %job.id,
                    state = %existing.state,
                    attempt = delivery.attempt,
                    "Job already terminal, skipping redelivery",
                );
                return Ok(existing);
            }
            Some(existing) => existing,
            None => JobSnapshot::pending(job.id, job.input.clone()),
        };
        snapshot.begin_attempt()?;

        tracing::info!(
            job_id = %job.id,
            attempt = delivery.attempt,
            "Job execution started",
        );

        // Validating: presence of required fields only.
        self.advance(&mut snapshot, Phase::Validating).await?;
        let missing = missing_fields(&snapshot.input);
        if !missing.is_empty() {
            let detail = format!("Missing required fields: {}", missing.join(", "));
            return self
                .finish_failed(snapshot, JobError::new(FailureKind::InvalidInput, detail))
                .await;
        }

        // Predicting: numeric conversion, then inference.
        self.advance(&mut snapshot, Phase::Predicting).await?;
        let features = match feature_vector(&snapshot.input) {
            Ok(features) => features,
            Err(e) => {
                let error = JobError::new(FailureKind::MalformedValue, e.to_string());
                return self.finish_failed(snapshot, error).await;
            }
        };
        let label = match self.predictor.predict(&features) {
            Ok(label) => label,
            Err(e) => {
                let error = JobError::new(FailureKind::PredictorError, e.to_string());
                return self.finish_failed(snapshot, error).await;
            }
        };
        tracing::debug!(job_id = %job.id, label = %label, "Prediction computed");

        // Rendering: every submitted field, in submission order.
        self.advance(&mut snapshot, Phase::Rendering).await?;
        let document = match self.writer.render(&snapshot.input.entries(), &label) {
            Ok(document) => document,
            Err(e) => {
                let error = JobError::new(FailureKind::ReportError, e.to_string());
                return self.finish_failed(snapshot, error).await;
            }
        };

        self.advance(&mut snapshot, Phase::Persisting).await?;
        let reference = match self
            .artifacts
            .persist(job.id, self.writer.extension(), &document)
            .await
        {
            Ok(reference) => reference,
            Err(e) => {
                let error = JobError::new(FailureKind::StorageError, e.to_string());
                return self.finish_failed(snapshot, error).await;
            }
        };

        self.advance(&mut snapshot, Phase::Finalizing).await?;
        snapshot.succeed(reference)?;
        self.store.put(&snapshot).await?;

        tracing::info!(
            job_id = %job.id,
            label = %label,
            artifact = %snapshot.result.as_ref().map(|r| r.as_str()).unwrap_or_default(),
            "Job succeeded",
        );
        Ok(snapshot)
    }

    async fn advance(&self, snapshot: &mut JobSnapshot, phase: Phase) -> Result<(), CoreError> {
        snapshot.enter(phase)?;
        self.store.put(snapshot).await?;
        tracing::debug!(
            job_id = %snapshot.id,
            phase = %phase,
            progress = snapshot.progress,
            "Job advanced",
        );
        Ok(())
    }

    async fn finish_failed(
        &self,
        mut snapshot: JobSnapshot,
        error: JobError,
    ) -> Result<JobSnapshot, CoreError> {
        tracing::warn!(
            job_id = %snapshot.id,
            phase = %snapshot.phase.map(|p| p.as_str()).unwrap_or_default(),
            kind = %error.kind,
            detail = %error.detail,
            "Job failed",
        );
        snapshot.fail(error)?;
        self.store.put(&snapshot).await?;
        Ok(snapshot)
    }
}
