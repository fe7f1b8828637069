//! Integration tests for the submission upload, review and query endpoints.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{body_json, delete, get, post_json, put_json, uniform};
use scenegate_db::{AutoApprovalCounter, MemoryStore};
use scenegate_pipeline::test_support::DownStore;
use serde_json::{json, Value};

fn upload(scene: i32, template: &str, submitted: &str) -> Value {
    json!({
        "templateId": "tpl",
        "assignmentId": "asg",
        "userId": "usr",
        "sceneNumber": scene,
        "sceneTitle": "Intro",
        "submittedLayout": uniform(submitted),
        "templateLayout": uniform(template),
    })
}

async fn submit(app: &axum::Router, body: Value) -> Value {
    let response = post_json(app.clone(), "/api/v1/submissions", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[tokio::test]
async fn matching_upload_is_auto_approved() {
    let (app, _) = common::build_test_app();
    let data = submit(&app, upload(1, "red", "red")).await;

    assert_eq!(data["decision"]["outcome"], "auto_approve");
    assert_eq!(data["submission"]["status"], "approved");
    assert_eq!(data["submission"]["reviewedBy"], "system");
    assert_eq!(data["submission"]["similarityScore"], 1.0);
    assert_eq!(data["degraded"], false);
}

#[tokio::test]
async fn weak_upload_waits_for_review_with_suggestions() {
    let (app, _) = common::build_test_app();
    let data = submit(&app, upload(1, "red", "blue")).await;

    assert_eq!(data["decision"]["outcome"], "manual");
    assert_eq!(data["decision"]["reason"], "below_threshold");
    assert_eq!(data["submission"]["status"], "pending");
    assert!(!data["submission"]["aiSuggestions"].as_array().unwrap().is_empty());

    let pending = body_json(get(app, "/api/v1/submissions/pending").await).await;
    assert_eq!(pending["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn provider_failure_marks_result_degraded() {
    let (app, _) = common::build_test_app();
    let data = submit(&app, upload(1, "a presenter at a desk", "a presenter at a desk")).await;

    assert_eq!(data["degraded"], true);
    // Identical text hashes to identical fallback vectors.
    let score = data["submission"]["similarityScore"].as_f64().unwrap();
    assert!(score > 0.999, "expected near-identical score, got {score}");
}

#[tokio::test]
async fn threshold_store_outage_still_records_upload_for_review() {
    let store = Arc::new(MemoryStore::new());
    let app = common::build_test_app_with_thresholds(store.clone(), Arc::new(DownStore));
    let data = submit(&app, upload(1, "red", "red")).await;

    assert_eq!(data["degraded"], true);
    assert_eq!(data["decision"]["outcome"], "manual");
    assert_eq!(data["decision"]["reason"], "store_unavailable");
    assert_eq!(data["submission"]["status"], "pending");
    assert_eq!(store.used("tpl").await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_upload_returns_400() {
    let (app, _) = common::build_test_app();
    let response = post_json(app, "/api/v1/submissions", upload(0, "red", "red")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn missing_template_layout_returns_404() {
    let (app, _) = common::build_test_app();
    let mut body = upload(1, "red", "red");
    body.as_object_mut().unwrap().remove("templateLayout");

    let response = post_json(app, "/api/v1/submissions", body).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stored_template_layout_is_used() {
    let (app, _) = common::build_test_app();
    let response = put_json(
        app.clone(),
        "/api/v1/layouts/template/tpl",
        json!({ "scenes": [uniform("green"), uniform("blue")] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = upload(2, "unused", "blue");
    body.as_object_mut().unwrap().remove("templateLayout");
    let data = submit(&app, body).await;
    assert_eq!(data["submission"]["status"], "approved");
}

// ---------------------------------------------------------------------------
// Resubmission and history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resubmission_links_chain_and_history() {
    let (app, _) = common::build_test_app();
    let first = submit(&app, upload(1, "red", "blue")).await["submission"].clone();
    let second = submit(&app, upload(1, "red", "red")).await["submission"].clone();

    assert_eq!(second["resubmissionCount"], 1);
    assert_eq!(second["previousSubmissionId"], first["id"]);

    let id = second["id"].as_str().unwrap();
    let history = body_json(get(app.clone(), &format!("/api/v1/submissions/{id}/history")).await).await;
    let ids: Vec<&Value> = history["data"].as_array().unwrap().iter().map(|s| &s["id"]).collect();
    assert_eq!(ids, vec![&first["id"], &second["id"]]);

    // The superseded row can no longer be reviewed.
    let first_id = first["id"].as_str().unwrap();
    let response = post_json(
        app,
        &format!("/api/v1/submissions/{first_id}/approve"),
        json!({ "reviewerId": "mgr" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reject_requires_feedback_and_keeps_pending() {
    let (app, _) = common::build_test_app();
    let data = submit(&app, upload(1, "red", "blue")).await;
    let id = data["submission"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/submissions/{id}/reject");

    let response = post_json(app.clone(), &uri, json!({ "reviewerId": "mgr", "feedback": "  " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app.clone(),
        &uri,
        json!({ "reviewerId": "mgr", "feedback": "Move closer to the camera" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["feedback"][0], "Move closer to the camera");
}

#[tokio::test]
async fn approving_twice_conflicts() {
    let (app, _) = common::build_test_app();
    let data = submit(&app, upload(1, "red", "blue")).await;
    let id = data["submission"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/submissions/{id}/approve");

    let response = post_json(app.clone(), &uri, json!({ "reviewerId": "mgr" })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(app, &uri, json!({ "reviewerId": "mgr" })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn override_records_original_score() {
    let (app, _) = common::build_test_app();
    let data = submit(&app, upload(1, "red", "blue")).await;
    let id = data["submission"]["id"].as_str().unwrap().to_string();

    let response = post_json(
        app,
        &format!("/api/v1/submissions/{id}/override"),
        json!({ "approved": true, "reason": "Creative choice", "reviewerId": "mgr" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "approved");
    assert_eq!(json["data"]["manualOverride"]["overrideBy"], "mgr");
    assert_eq!(
        json["data"]["manualOverride"]["originalSimilarityScore"],
        data["submission"]["similarityScore"]
    );
}

#[tokio::test]
async fn unknown_submission_returns_404() {
    let (app, _) = common::build_test_app();
    let response = get(app, &format!("/api/v1/submissions/{}", uuid::Uuid::nil())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Queries and cascade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn progress_and_slot_queries() {
    let (app, _) = common::build_test_app();
    submit(&app, upload(1, "red", "red")).await;
    submit(&app, upload(2, "red", "blue")).await;

    let json = body_json(
        get(app.clone(), "/api/v1/assignments/asg/users/usr/progress?totalScenes=4").await,
    )
    .await;
    assert_eq!(json["data"]["approvedScenes"], 1);
    assert_eq!(json["data"]["pendingScenes"], 1);
    assert_eq!(json["data"]["completionPercentage"], 25.0);

    let json = body_json(get(app.clone(), "/api/v1/assignments/asg/users/usr/submissions").await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let response = get(app, "/api/v1/assignments/asg/users/usr/scenes/3/latest").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cascade_deletes_report_counts() {
    let (app, _) = common::build_test_app();
    submit(&app, upload(1, "red", "red")).await;
    submit(&app, upload(2, "red", "red")).await;

    let json = body_json(delete(app.clone(), "/api/v1/users/usr/submissions").await).await;
    assert_eq!(json["data"]["deleted"], 2);

    let json = body_json(delete(app, "/api/v1/templates/tpl/submissions").await).await;
    assert_eq!(json["data"]["deleted"], 0);
}
