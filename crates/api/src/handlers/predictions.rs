//! Handlers for prediction submission.
//!
//! Submission only records the job and enqueues it; validation happens
//! in the worker, so an incomplete record is still accepted here and
//! later ends as `FAILED` with `INVALID_INPUT`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::{Form, Json};
use sepal_core::record::FeatureRecord;
use sepal_core::validation::REQUIRED_FIELDS;
use sepal_core::types::JobId;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Name of the submit button field HTML forms send along with the data.
pub const SUBMIT_FIELD: &str = "Submit";

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
}

/// POST /api/v1/predictions
///
/// Accepts a flat JSON object of string fields. Returns 202 with the job id.
pub async fn submit_prediction(
    State(state): State<AppState>,
    Json(input): Json<FeatureRecord>,
) -> AppResult<impl IntoResponse> {
    let job_id = state.jobs.submit(input).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmitResponse { job_id },
        }),
    ))
}

/// POST /predict
///
/// Form-urlencoded variant of [`submit_prediction`]. The form's `Submit`
/// button value is not part of the record.
pub async fn submit_form(
    State(state): State<AppState>,
    Form(mut input): Form<FeatureRecord>,
) -> AppResult<impl IntoResponse> {
    input.remove(SUBMIT_FIELD);
    let job_id = state.jobs.submit(input).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmitResponse { job_id },
        }),
    ))
}

/// GET /
///
/// A bare HTML form with one text input per required field, posting to
/// `/predict`.
pub async fn form_page() -> Html<String> {
    let inputs: String = REQUIRED_FIELDS
        .iter()
        .map(|name| format!("<label>{name} <input type=\"text\" name=\"{name}\"></label><br>\n"))
        .collect();
    Html(format!(
        "<!doctype html>\n<title>Iris prediction</title>\n\
         <form method=\"post\" action=\"/predict\">\n{inputs}\
         <input type=\"submit\" name=\"{SUBMIT_FIELD}\" value=\"Predict\">\n</form>\n"
    ))
}
