//! Handlers for the `/jobs` resource.
//!
//! Ids that do not parse are reported the same way as ids that were never
//! issued: 404 `UNKNOWN_JOB`.
//!
//! `GET /progress?jobid=` and `GET /result?jobid=` are root-level aliases
//! for form clients that carry the id as a query parameter.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sepal_core::capability::content_type_for;
use sepal_core::error::CoreError;
use sepal_core::handle::Retrieval;
use sepal_core::status::JobStatusView;
use sepal_core::types::JobId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_job_id(raw: &str) -> Result<JobId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Core(CoreError::UnknownJob(raw.to_string())))
}

// ---------------------------------------------------------------------------
// Snapshot and progress
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_job_id(&id)?;
    let job = state.jobs.snapshot(id).await?;
    Ok(Json(DataResponse { data: job }))
}

/// GET /api/v1/jobs/{id}/progress
///
/// Never blocks. Terminal jobs always report `progress = 1.0`.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    progress_response(&state, &id).await
}

async fn progress_response(
    state: &AppState,
    raw_id: &str,
) -> AppResult<Json<DataResponse<JobStatusView>>> {
    let id = parse_job_id(raw_id)?;
    let status = state.jobs.status(id).await?;
    Ok(Json(DataResponse { data: status }))
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ResultQuery {
    /// Seconds to wait for the job to finish. Capped by server config.
    pub timeout_secs: Option<u64>,
}

/// Body of a 202 response: the job is still running.
#[derive(Debug, Serialize)]
pub struct NotReadyResponse {
    pub code: &'static str,
    pub data: JobStatusView,
}

/// GET /api/v1/jobs/{id}/result?timeout_secs=N
///
/// - 200 with the artifact bytes once the job has succeeded;
/// - 202 `NOT_READY` with the current status if the wait runs out;
/// - 409 `JOB_FAILED` with the failure kind if the job failed.
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ResultQuery>,
) -> AppResult<Response> {
    result_response(&state, &id, query.timeout_secs).await
}

async fn result_response(
    state: &AppState,
    raw_id: &str,
    timeout_secs: Option<u64>,
) -> AppResult<Response> {
    let id = parse_job_id(raw_id)?;
    let wait = state.config.result_wait(timeout_secs);

    match state.jobs.retrieve(id, wait).await? {
        Retrieval::Ready(artifact) => {
            let content_type = content_type_for(artifact.reference.extension());
            let disposition = format!(
                "attachment; filename=\"{}\"",
                artifact.reference.file_name()
            );
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                artifact.bytes,
            )
                .into_response())
        }
        Retrieval::NotReady(status) => {
            tracing::debug!(job_id = %id, state = %status.state, "Result not ready");
            Ok((
                StatusCode::ACCEPTED,
                [(header::RETRY_AFTER, "1")],
                Json(NotReadyResponse {
                    code: "NOT_READY",
                    data: status,
                }),
            )
                .into_response())
        }
        Retrieval::Failed(error) => Err(AppError::JobFailed(error)),
    }
}

// ---------------------------------------------------------------------------
// Query-parameter aliases
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct JobIdQuery {
    pub jobid: String,
    pub timeout_secs: Option<u64>,
}

/// GET /progress?jobid=ID
pub async fn get_progress_by_query(
    State(state): State<AppState>,
    Query(query): Query<JobIdQuery>,
) -> AppResult<impl IntoResponse> {
    progress_response(&state, &query.jobid).await
}

/// GET /result?jobid=ID&timeout_secs=N
pub async fn get_result_by_query(
    State(state): State<AppState>,
    Query(query): Query<JobIdQuery>,
) -> AppResult<Response> {
    result_response(&state, &query.jobid, query.timeout_secs).await
}
