//! Client-facing progress view of a job.

use serde::Serialize;

use crate::job::{JobError, JobSnapshot, JobState, TERMINAL_PROGRESS};

/// What a polling client sees: how far along, and done vs. failed.
///
/// Terminal states always report `progress = 1.0`, whatever was stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusView {
    pub state: JobState,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl From<&JobSnapshot> for JobStatusView {
    fn from(job: &JobSnapshot) -> Self {
        let progress = if job.is_terminal() {
            TERMINAL_PROGRESS
        } else {
            job.progress.clamp(0.0, TERMINAL_PROGRESS)
        };
        let error = match job.state {
            JobState::Failed => job.error.clone(),
            _ => None,
        };
        Self {
            state: job.state,
            progress,
            error,
        }
    }
}
