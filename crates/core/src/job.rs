//! The job snapshot and its execution state machine.
//!
//! ```text
//! PENDING --(dequeued)--------------> RUNNING(0.1, validating)
//! RUNNING --(validation passes)-----> RUNNING(0.2, predicting)
//! RUNNING --(prediction computed)---> RUNNING(0.6, rendering)
//! RUNNING --(rendering in progress)-> RUNNING(0.8, persisting)
//! RUNNING --(artifact persisted)----> RUNNING(0.9, finalizing)
//! RUNNING --(finalize ok)-----------> SUCCEEDED(1.0)
//! RUNNING --(any phase fails)-------> FAILED(1.0)
//! ```
//!
//! Transitions go through [`JobSnapshot::enter`], [`JobSnapshot::succeed`]
//! and [`JobSnapshot::fail`], which keep these invariants:
//!
//! - progress never decreases;
//! - `result` is set only when `SUCCEEDED`, `error` only when `FAILED`;
//! - a terminal snapshot accepts no further transitions.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::record::FeatureRecord;
use crate::types::{ArtifactRef, JobId, Timestamp};

/// Progress reported once a job is terminal, whatever the outcome.
pub const TERMINAL_PROGRESS: f64 = 1.0;

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// A named, strictly sequential sub-step of job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Validating,
    Predicting,
    Rendering,
    Persisting,
    Finalizing,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 5] = [
        Phase::Validating,
        Phase::Predicting,
        Phase::Rendering,
        Phase::Persisting,
        Phase::Finalizing,
    ];

    /// Progress fraction published when the job enters this phase.
    ///
    /// Polling clients render these directly, so they are part of the
    /// observable contract.
    pub fn progress(self) -> f64 {
        match self {
            Phase::Validating => 0.1,
            Phase::Predicting => 0.2,
            Phase::Rendering => 0.6,
            Phase::Persisting => 0.8,
            Phase::Finalizing => 0.9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Validating => "validating",
            Phase::Predicting => "predicting",
            Phase::Rendering => "rendering",
            Phase::Persisting => "persisting",
            Phase::Finalizing => "finalizing",
        }
    }

    /// Parse the name produced by [`Phase::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// Machine-distinguishable reason a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// A required field is missing.
    InvalidInput,
    /// A required field is present but not numeric.
    MalformedValue,
    /// The predictor rejected the vector or could not run.
    PredictorError,
    /// The report writer could not render the document.
    ReportError,
    /// The artifact could not be persisted.
    StorageError,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::InvalidInput => "INVALID_INPUT",
            FailureKind::MalformedValue => "MALFORMED_VALUE",
            FailureKind::PredictorError => "PREDICTOR_ERROR",
            FailureKind::ReportError => "REPORT_ERROR",
            FailureKind::StorageError => "STORAGE_ERROR",
        }
    }

    /// Parse the code produced by [`FailureKind::as_str`].
    pub fn from_code(code: &str) -> Option<Self> {
        [
            FailureKind::InvalidInput,
            FailureKind::MalformedValue,
            FailureKind::PredictorError,
            FailureKind::ReportError,
            FailureKind::StorageError,
        ]
        .into_iter()
        .find(|k| k.as_str() == code)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason code plus human-readable detail, recorded on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct JobError {
    pub kind: FailureKind,
    pub detail: String,
}

impl JobError {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// JobSnapshot
// ---------------------------------------------------------------------------

/// The full state of one job as held by the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub input: FeatureRecord,
    pub state: JobState,
    pub phase: Option<Phase>,
    pub progress: f64,
    pub result: Option<ArtifactRef>,
    pub error: Option<JobError>,
    /// Deliveries that started executing this job.
    pub attempts: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JobSnapshot {
    /// A freshly submitted job.
    pub fn pending(id: JobId, input: FeatureRecord) -> Self {
        let now = Utc::now();
        Self {
            id,
            input,
            state: JobState::Pending,
            phase: None,
            progress: 0.0,
            result: None,
            error: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Record that a delivery started executing this job.
    pub fn begin_attempt(&mut self) -> Result<(), CoreError> {
        self.ensure_not_terminal()?;
        self.attempts += 1;
        self.touch();
        Ok(())
    }

    /// Move into `phase` as `RUNNING`.
    ///
    /// Progress becomes the larger of the current value and the phase
    /// fraction, so a redelivered job re-entering an early phase does not
    /// move backwards.
    pub fn enter(&mut self, phase: Phase) -> Result<(), CoreError> {
        self.ensure_not_terminal()?;
        self.state = JobState::Running;
        self.phase = Some(phase);
        self.progress = self.progress.max(phase.progress());
        self.touch();
        Ok(())
    }

    /// Finish successfully with the persisted artifact.
    pub fn succeed(&mut self, artifact: ArtifactRef) -> Result<(), CoreError> {
        self.ensure_running("succeed")?;
        self.state = JobState::Succeeded;
        self.progress = TERMINAL_PROGRESS;
        self.result = Some(artifact);
        self.error = None;
        self.touch();
        Ok(())
    }

    /// Finish with a failure. Progress jumps straight to 1.0.
    pub fn fail(&mut self, error: JobError) -> Result<(), CoreError> {
        self.ensure_running("fail")?;
        self.state = JobState::Failed;
        self.progress = TERMINAL_PROGRESS;
        self.result = None;
        self.error = Some(error);
        self.touch();
        Ok(())
    }

    fn ensure_not_terminal(&self) -> Result<(), CoreError> {
        if self.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Job {} is already {}",
                self.id, self.state
            )));
        }
        Ok(())
    }

    fn ensure_running(&self, action: &str) -> Result<(), CoreError> {
        if self.state != JobState::Running {
            return Err(CoreError::Conflict(format!(
                "Cannot {action} job {} in state {}",
                self.id, self.state
            )));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn new_job() -> JobSnapshot {
        JobSnapshot::pending(JobId::generate(), FeatureRecord::new().with("a", "1"))
    }

    #[test]
    fn pending_job_defaults() {
        let job = new_job();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.phase, None);
        assert_eq!(job.progress, 0.0);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert_eq!(job.attempts, 0);
    }

    #[test]
    fn phase_fractions_are_fixed() {
        let fractions: Vec<f64> = Phase::ALL.iter().map(|p| p.progress()).collect();
        assert_eq!(fractions, vec![0.1, 0.2, 0.6, 0.8, 0.9]);
    }

    #[test]
    fn happy_path_walks_all_phases() {
        let mut job = new_job();
        let mut seen = Vec::new();
        for phase in Phase::ALL {
            job.enter(phase).unwrap();
            assert_eq!(job.state, JobState::Running);
            seen.push(job.progress);
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));

        job.succeed(ArtifactRef::new("x.txt")).unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.progress, 1.0);
        assert_eq!(job.result, Some(ArtifactRef::new("x.txt")));
        assert!(job.error.is_none());
    }

    #[test]
    fn failure_jumps_to_full_progress() {
        let mut job = new_job();
        job.enter(Phase::Validating).unwrap();
        job.fail(JobError::new(FailureKind::InvalidInput, "missing"))
            .unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.progress, 1.0);
        assert!(job.result.is_none());
        assert_eq!(job.error.as_ref().unwrap().kind, FailureKind::InvalidInput);
    }

    #[test]
    fn reentering_an_earlier_phase_keeps_progress() {
        let mut job = new_job();
        job.enter(Phase::Rendering).unwrap();
        job.enter(Phase::Validating).unwrap();
        assert_eq!(job.phase, Some(Phase::Validating));
        assert_eq!(job.progress, 0.6);
    }

    #[test]
    fn terminal_job_rejects_transitions() {
        let mut job = new_job();
        job.enter(Phase::Validating).unwrap();
        job.fail(JobError::new(FailureKind::InvalidInput, "x")).unwrap();

        assert_matches!(job.enter(Phase::Predicting), Err(CoreError::Conflict(_)));
        assert_matches!(job.begin_attempt(), Err(CoreError::Conflict(_)));
        assert_matches!(
            job.succeed(ArtifactRef::new("y")),
            Err(CoreError::Conflict(_))
        );
        assert_eq!(job.state, JobState::Failed);
    }

    #[test]
    fn pending_job_cannot_finish_directly() {
        let mut job = new_job();
        assert_matches!(
            job.succeed(ArtifactRef::new("y")),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            job.fail(JobError::new(FailureKind::StorageError, "disk")),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn codes_round_trip_through_names() {
        for phase in Phase::ALL {
            assert_eq!(Phase::from_name(phase.as_str()), Some(phase));
        }
        assert_eq!(
            FailureKind::from_code("MALFORMED_VALUE"),
            Some(FailureKind::MalformedValue)
        );
        assert_eq!(FailureKind::from_code("nope"), None);
    }

    #[test]
    fn serializes_with_wire_names() {
        let mut job = new_job();
        job.enter(Phase::Validating).unwrap();
        job.fail(JobError::new(FailureKind::MalformedValue, "bad"))
            .unwrap();

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["state"], "FAILED");
        assert_eq!(json["phase"], "validating");
        assert_eq!(json["error"]["kind"], "MALFORMED_VALUE");
    }
}
