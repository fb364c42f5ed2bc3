//! Route definitions for the `/jobs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /{id}            -> get_job
/// GET    /{id}/progress   -> get_progress
/// GET    /{id}/result     -> get_result
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/progress", get(jobs::get_progress))
        .route("/{id}/result", get(jobs::get_result))
}

/// Root-level aliases taking the id as `?jobid=`.
///
/// ```text
/// GET    /progress        -> get_progress_by_query
/// GET    /result          -> get_result_by_query
/// ```
pub fn query_router() -> Router<AppState> {
    Router::new()
        .route("/progress", get(jobs::get_progress_by_query))
        .route("/result", get(jobs::get_result_by_query))
}
