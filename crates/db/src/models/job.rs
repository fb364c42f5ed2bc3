//! Row types for the `jobs` and `job_queue` tables.

use sepal_core::backend::{Delivery, QueuedJob};
use sepal_core::error::CoreError;
use sepal_core::job::{FailureKind, JobError, JobSnapshot, Phase};
use sepal_core::record::FeatureRecord;
use sepal_core::types::{ArtifactRef, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{JobStatus, StatusId};

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub status_id: StatusId,
    pub phase: Option<String>,
    pub progress: f64,
    pub input: String,
    pub result: Option<String>,
    pub error_kind: Option<String>,
    pub error_detail: Option<String>,
    pub attempts: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<JobRow> for JobSnapshot {
    type Error = CoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::from_id(row.status_id).ok_or_else(|| {
            CoreError::Internal(format!("Job {} has unknown status_id {}", row.id, row.status_id))
        })?;

        let phase = row
            .phase
            .as_deref()
            .map(|name| {
                Phase::from_name(name).ok_or_else(|| {
                    CoreError::Internal(format!("Job {} has unknown phase '{name}'", row.id))
                })
            })
            .transpose()?;

        let error = row
            .error_kind
            .as_deref()
            .map(|code| {
                FailureKind::from_code(code)
                    .map(|kind| JobError::new(kind, row.error_detail.clone().unwrap_or_default()))
                    .ok_or_else(|| {
                        CoreError::Internal(format!("Job {} has unknown error kind '{code}'", row.id))
                    })
            })
            .transpose()?;

        let input: FeatureRecord = serde_json::from_str(&row.input).map_err(CoreError::backend)?;

        Ok(JobSnapshot {
            id: row.id.into(),
            input,
            state: status.into(),
            phase,
            progress: row.progress,
            result: row.result.map(ArtifactRef::new),
            error,
            attempts: u32::try_from(row.attempts).unwrap_or(0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A claimed row from the `job_queue` table.
#[derive(Debug, Clone, FromRow)]
pub struct QueueRow {
    pub job_id: Uuid,
    pub payload: String,
    pub attempts: i32,
}

impl TryFrom<QueueRow> for Delivery {
    type Error = CoreError;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        let input: FeatureRecord =
            serde_json::from_str(&row.payload).map_err(CoreError::backend)?;
        Ok(Delivery {
            job: QueuedJob {
                id: row.job_id.into(),
                input,
            },
            attempt: u32::try_from(row.attempts).unwrap_or(1).max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use sepal_core::job::JobState;

    fn row() -> JobRow {
        JobRow {
            id: Uuid::now_v7(),
            status_id: JobStatus::Running.id(),
            phase: Some("predicting".into()),
            progress: 0.2,
            input: r#"{"Sepal width":"3.1","Sepal length":"4.6"}"#.into(),
            result: None,
            error_kind: None,
            error_detail: None,
            attempts: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn running_row_converts() {
        let job = JobSnapshot::try_from(row()).unwrap();
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.phase, Some(Phase::Predicting));
        assert_eq!(job.attempts, 1);

        let names: Vec<&str> = job.input.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["Sepal width", "Sepal length"]);
    }

    #[test]
    fn failed_row_carries_error() {
        let mut r = row();
        r.status_id = JobStatus::Failed.id();
        r.progress = 1.0;
        r.error_kind = Some("MALFORMED_VALUE".into());
        r.error_detail = Some("Field 'Sepal width' has non-numeric value 'x'".into());

        let job = JobSnapshot::try_from(r).unwrap();
        let error = job.error.unwrap();
        assert_eq!(error.kind, FailureKind::MalformedValue);
        assert!(error.detail.contains("Sepal width"));
    }

    #[test]
    fn unknown_codes_are_rejected() {
        let mut r = row();
        r.status_id = 9;
        assert_matches!(JobSnapshot::try_from(r), Err(CoreError::Internal(_)));

        let mut r = row();
        r.phase = Some("dreaming".into());
        assert_matches!(JobSnapshot::try_from(r), Err(CoreError::Internal(_)));
    }

    #[test]
    fn queue_row_converts_to_delivery() {
        let delivery = Delivery::try_from(QueueRow {
            job_id: Uuid::now_v7(),
            payload: r#"{"a":"1"}"#.into(),
            attempts: 2,
        })
        .unwrap();
        assert_eq!(delivery.attempt, 2);
        assert_eq!(delivery.job.input.get("a"), Some("1"));
    }
}
