//! Route definitions for prediction submission.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::predictions;
use crate::state::AppState;

/// Routes mounted at `/predictions`.
///
/// ```text
/// POST   /                -> submit_prediction
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(predictions::submit_prediction))
}

/// Root-level form page and form submission.
///
/// ```text
/// GET    /                -> form_page
/// POST   /predict         -> submit_form
/// ```
pub fn form_router() -> Router<AppState> {
    Router::new()
        .route("/", get(predictions::form_page))
        .route("/predict", post(predictions::submit_form))
}
