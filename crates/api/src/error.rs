use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sepal_core::error::CoreError;
use sepal_core::job::JobError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds the job-failure outcome
/// of result retrieval.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `sepal_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The job reached `FAILED`; there is no result to return.
    #[error("Job failed: {0}")]
    JobFailed(JobError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::UnknownJob(id) => (
                    StatusCode::NOT_FOUND,
                    "UNKNOWN_JOB",
                    format!("No job with id {id}"),
                ),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Backend(err) => {
                    tracing::error!(error = %err, "Job backend error");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "BACKEND_UNAVAILABLE",
                        "The job backend is unavailable".to_string(),
                    )
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::JobFailed(error) => {
                let body = json!({
                    "error": error.detail,
                    "code": "JOB_FAILED",
                    "kind": error.kind,
                });
                return (StatusCode::CONFLICT, axum::Json(body)).into_response();
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
