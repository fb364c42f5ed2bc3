//! Integration tests for submission, progress polling and result retrieval.

mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use common::{body_bytes, body_json, get, post_form, post_json, setosa_json, submit};
use sepal_worker::config::ReportFormat;
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: Submission is accepted and starts PENDING
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_returns_202_and_job_starts_pending() {
    let t = common::build_test_app();
    let id = submit(&t.app, setosa_json()).await;

    let response = get(t.app.clone(), &format!("/api/v1/jobs/{id}/progress")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["state"], "PENDING");
    assert_eq!(json["data"]["progress"], 0.0);
    assert!(json["data"].get("error").is_none());
    assert_eq!(t.queue.ready_len().await, 1);
}

// ---------------------------------------------------------------------------
// Test: Valid input runs to SUCCEEDED and the report is downloadable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_submission_produces_downloadable_report() {
    let t = common::build_test_app();
    let id = submit(&t.app, setosa_json()).await;

    assert!(t.worker.run_once().await.unwrap());

    let json = body_json(get(t.app.clone(), &format!("/api/v1/jobs/{id}/progress")).await).await;
    assert_eq!(json["data"]["state"], "SUCCEEDED");
    assert_eq!(json["data"]["progress"], 1.0);

    let response = get(t.app.clone(), &format!("/api/v1/jobs/{id}/result")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, format!("attachment; filename=\"{id}.txt\""));

    let report = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(
        report,
        "Sepal length = 4.6\n\
         Sepal width = 3.1\n\
         Petal length = 1.5\n\
         Petal width = 0.2\n\
         Predicted: Iris-setosa\n"
    );
}

#[tokio::test]
async fn get_job_returns_full_snapshot() {
    let t = common::build_test_app();
    let id = submit(&t.app, setosa_json()).await;
    t.worker.run_once().await.unwrap();

    let json = body_json(get(t.app.clone(), &format!("/api/v1/jobs/{id}")).await).await;
    let data = &json["data"];
    assert_eq!(data["id"], id.as_str());
    assert_eq!(data["state"], "SUCCEEDED");
    assert_eq!(data["phase"], "finalizing");
    assert_eq!(data["attempts"], 1);
    assert_eq!(data["result"], format!("{id}.txt"));
    assert_eq!(data["input"]["Sepal length"], "4.6");
}

#[tokio::test]
async fn pdf_report_is_served_as_pdf() {
    let t = common::build_test_app_with(ReportFormat::Pdf);
    let id = submit(&t.app, setosa_json()).await;
    t.worker.run_once().await.unwrap();

    let response = get(t.app.clone(), &format!("/api/v1/jobs/{id}/result")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{id}.pdf\"").as_str()
    );
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

// ---------------------------------------------------------------------------
// Test: Failures surface through progress and result
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_field_fails_with_invalid_input() {
    let t = common::build_test_app();
    let id = submit(
        &t.app,
        json!({ "Sepal width": "3.1", "Petal length": "1.5", "Petal width": "0.2" }),
    )
    .await;

    t.worker.run_once().await.unwrap();

    let json = body_json(get(t.app.clone(), &format!("/api/v1/jobs/{id}/progress")).await).await;
    assert_eq!(json["data"]["state"], "FAILED");
    assert_eq!(json["data"]["progress"], 1.0);
    assert_eq!(json["data"]["error"]["kind"], "INVALID_INPUT");

    let response = get(t.app.clone(), &format!("/api/v1/jobs/{id}/result")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "JOB_FAILED");
    assert_eq!(json["kind"], "INVALID_INPUT");
    assert!(json["error"].as_str().unwrap().contains("Sepal length"));

    assert_eq!(t.artifacts.len().await, 0);
}

#[tokio::test]
async fn non_numeric_value_fails_with_malformed_value() {
    let t = common::build_test_app();
    let mut body = setosa_json();
    body["Petal length"] = json!("long");
    let id = submit(&t.app, body).await;

    t.worker.run_once().await.unwrap();

    let json = body_json(get(t.app.clone(), &format!("/api/v1/jobs/{id}/progress")).await).await;
    assert_eq!(json["data"]["state"], "FAILED");
    assert_eq!(json["data"]["error"]["kind"], "MALFORMED_VALUE");
}

// ---------------------------------------------------------------------------
// Test: Result retrieval waits or reports NOT_READY
// ---------------------------------------------------------------------------

#[tokio::test]
async fn result_reports_not_ready_when_wait_runs_out() {
    let t = common::build_test_app();
    let id = submit(&t.app, setosa_json()).await;

    let response = get(
        t.app.clone(),
        &format!("/api/v1/jobs/{id}/result?timeout_secs=0"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.headers()[header::RETRY_AFTER], "1");

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_READY");
    assert_eq!(json["data"]["state"], "PENDING");
}

#[tokio::test]
async fn result_waits_for_the_worker() {
    let t = common::build_test_app();
    let id = submit(&t.app, setosa_json()).await;

    let worker = t.worker;
    let background = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        worker.run_once().await.unwrap();
    });

    let response = get(
        t.app.clone(),
        &format!("/api/v1/jobs/{id}/result?timeout_secs=5"),
    )
    .await;
    background.await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(report.ends_with("Predicted: Iris-setosa\n"));
}

// ---------------------------------------------------------------------------
// Test: Unknown ids are never reported as a state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_job_returns_404_everywhere() {
    let t = common::build_test_app();
    let never_issued = "0190b3a4-7c1e-7d2a-9f00-000000000000";

    for path in [
        format!("/api/v1/jobs/{never_issued}"),
        format!("/api/v1/jobs/{never_issued}/progress"),
        format!("/api/v1/jobs/{never_issued}/result?timeout_secs=0"),
        "/api/v1/jobs/not-a-uuid/progress".to_string(),
    ] {
        let response = get(t.app.clone(), &path).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        let json = body_json(response).await;
        assert_eq!(json["code"], "UNKNOWN_JOB", "{path}");
    }
}

// ---------------------------------------------------------------------------
// Test: Form submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn form_submission_drops_submit_button_and_keeps_order() {
    let t = common::build_test_app();
    let response = post_form(
        t.app.clone(),
        "/predict",
        "Sepal+length=4.6&Sepal+width=3.1&Petal+length=1.5&Petal+width=0.2&Submit=Predict",
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = body_json(response).await["data"]["job_id"]
        .as_str()
        .unwrap()
        .to_string();

    t.worker.run_once().await.unwrap();

    let response = get(t.app.clone(), &format!("/api/v1/jobs/{id}/result")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(!report.contains("Submit"));
    assert!(report.starts_with("Sepal length = 4.6\nSepal width = 3.1\n"));
}

#[tokio::test]
async fn json_submission_must_be_an_object_of_strings() {
    let t = common::build_test_app();
    let response = post_json(t.app.clone(), "/api/v1/predictions", json!(["4.6"])).await;
    assert!(response.status().is_client_error());
    assert_eq!(t.queue.ready_len().await, 0);
}

// ---------------------------------------------------------------------------
// Test: Root-level form page and query-parameter aliases
// ---------------------------------------------------------------------------

#[tokio::test]
async fn form_page_lists_required_fields() {
    let t = common::build_test_app();
    let response = get(t.app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(page.contains("action=\"/predict\""));
    for field in ["Sepal length", "Sepal width", "Petal length", "Petal width"] {
        assert!(page.contains(&format!("name=\"{field}\"")), "{field}");
    }
}

#[tokio::test]
async fn query_aliases_serve_progress_and_result() {
    let t = common::build_test_app();
    let id = submit(&t.app, setosa_json()).await;

    let json = body_json(get(t.app.clone(), &format!("/progress?jobid={id}")).await).await;
    assert_eq!(json["data"]["state"], "PENDING");

    t.worker.run_once().await.unwrap();

    let json = body_json(get(t.app.clone(), &format!("/progress?jobid={id}")).await).await;
    assert_eq!(json["data"]["state"], "SUCCEEDED");
    assert_eq!(json["data"]["progress"], 1.0);

    let response = get(t.app.clone(), &format!("/result?jobid={id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(report.ends_with("Predicted: Iris-setosa\n"));
}

#[tokio::test]
async fn query_alias_reports_unknown_job() {
    let t = common::build_test_app();
    let response = get(t.app.clone(), "/progress?jobid=nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "UNKNOWN_JOB");

    let response = get(t.app, "/result").await;
    assert!(response.status().is_client_error());
}
