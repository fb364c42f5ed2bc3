pub mod health;
pub mod jobs;
pub mod predictions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /predictions                    submit (JSON, 202)
///
/// /jobs/{id}                      full snapshot
/// /jobs/{id}/progress             state + progress poll
/// /jobs/{id}/result               blocking artifact retrieval
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/predictions", predictions::router())
        .nest("/jobs", jobs::router())
}
