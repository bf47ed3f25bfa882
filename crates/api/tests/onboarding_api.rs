//! HTTP-level integration tests for the onboarding wizard endpoints.
//!
//! The app runs over the in-memory gateway and storage, so no database is
//! needed.

mod common;

use axum::http::StatusCode;
use common::{
    body_bytes, body_json, build_test_app, delete_auth, get, get_auth, post_json_auth,
    put_json_auth, token, upload_auth, worker_token,
};
use serde_json::{json, Value};

const WORKER: i64 = 7;

fn profile_body() -> Value {
    json!({
        "full_name": "Jane Doe",
        "date_of_birth": "1990-01-01",
        "phone": "+14155552671",
        "email": "jane@x.com",
    })
}

fn skills_body() -> Value {
    json!({
        "skills": [{ "skill_name": "Welding", "experience_years": 4 }],
        "certifications": [],
    })
}

// ---------------------------------------------------------------------------
// Health and auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ok_without_a_database() {
    let t = build_test_app();
    let response = get(&t.app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["db_healthy"].is_null());
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let t = build_test_app();
    let response = get(&t.app, "/api/v1/onboarding").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn non_worker_role_is_forbidden() {
    let t = build_test_app();
    let response = get_auth(&t.app, "/api/v1/onboarding", &token(1, "admin")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Steps and navigation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initialize_creates_a_draft_at_step_one() {
    let t = build_test_app();
    let response = post_json_auth(&t.app, "/api/v1/onboarding", json!({}), &worker_token(WORKER)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["status"], "draft");
    assert_eq!(data["current_step"], "profile");
    assert_eq!(data["current_step_number"], 1);
    assert_eq!(data["completion_percent"], 0);
    assert_eq!(data["read_only"], false);
    assert!(t.gateway.record_for_user(WORKER).is_some());
}

#[tokio::test]
async fn completing_profile_advances_to_documents() {
    let t = build_test_app();
    let token = worker_token(WORKER);

    let response = put_json_auth(&t.app, "/api/v1/onboarding/steps/1", profile_body(), &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["completed_steps"], json!(["profile"]));
    assert_eq!(data["current_step"], "documents");
    assert_eq!(data["step_validity"]["profile"], true);
    assert_eq!(data["snapshot"]["profile"]["full_name"], "Jane Doe");
}

#[tokio::test]
async fn invalid_profile_returns_field_errors() {
    let t = build_test_app();
    let mut body = profile_body();
    body["email"] = json!("not-an-email");

    let response = put_json_auth(
        &t.app,
        "/api/v1/onboarding/steps/1",
        body,
        &worker_token(WORKER),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_FAILED");
    let fields: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"email"));
}

#[tokio::test]
async fn unknown_step_number_is_a_bad_request() {
    let t = build_test_app();
    let response = put_json_auth(
        &t.app,
        "/api/v1/onboarding/steps/9",
        json!({}),
        &worker_token(WORKER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn skipping_ahead_is_blocked() {
    let t = build_test_app();
    let token = worker_token(WORKER);

    let response = get_auth(&t.app, "/api/v1/onboarding/steps/3/reachable", &token).await;
    assert_eq!(body_json(response).await["data"]["reachable"], false);

    let response = post_json_auth(&t.app, "/api/v1/onboarding/navigate", json!({ "step": 3 }), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "NAVIGATION_BLOCKED");

    let response = post_json_auth(
        &t.app,
        "/api/v1/onboarding/steps/1/validity",
        json!({ "is_valid": true }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(&t.app, "/api/v1/onboarding/navigate", json!({ "step": 2 }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["current_step"], "documents");
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oversized_document_is_rejected_with_reason() {
    let t = build_test_app();
    let response = upload_auth(
        &t.app,
        "/api/v1/onboarding/documents/passport",
        "passport.pdf",
        &vec![0u8; 12 * 1024 * 1024],
        &worker_token(WORKER),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UPLOAD_REJECTED");
    assert_eq!(json["reason"]["reason"], "too_large");
    assert!(t.storage.is_empty());
}

#[tokio::test]
async fn unsupported_document_type_is_rejected() {
    let t = build_test_app();
    let response = upload_auth(
        &t.app,
        "/api/v1/onboarding/documents/pan",
        "pan.exe",
        b"MZ",
        &worker_token(WORKER),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["reason"]["reason"], "invalid_type");
}

#[tokio::test]
async fn uploaded_document_is_served_through_a_signed_url() {
    let t = build_test_app();
    let token = worker_token(WORKER);

    let response = upload_auth(
        &t.app,
        "/api/v1/onboarding/documents/pan",
        "pan.pdf",
        b"%PDF-1.7",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry = body_json(response).await;
    assert_eq!(entry["data"]["file_name"], "pan.pdf");
    assert_eq!(entry["data"]["mime_type"], "application/pdf");

    let response = get_auth(&t.app, "/api/v1/onboarding/documents/pan/url", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let url = body_json(response).await["data"]["url"]
        .as_str()
        .unwrap()
        .to_string();

    let response = get(&t.app, &url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    assert_eq!(body_bytes(response).await, b"%PDF-1.7");

    let tampered = format!("{}0", url);
    let response = get(&t.app, &tampered).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn removing_a_missing_document_is_not_found() {
    let t = build_test_app();
    let response = delete_auth(
        &t.app,
        "/api/v1/onboarding/documents/visa",
        &worker_token(WORKER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn removing_a_required_document_reopens_the_documents_step() {
    let t = build_test_app();
    let token = worker_token(WORKER);

    for ty in ["aadhaar_front", "aadhaar_back", "pan"] {
        let response = upload_auth(
            &t.app,
            &format!("/api/v1/onboarding/documents/{ty}"),
            &format!("{ty}.png"),
            b"png",
            &token,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let view = body_json(get_auth(&t.app, "/api/v1/onboarding", &token).await).await;
    assert_eq!(view["data"]["step_validity"]["documents"], true);

    let response = delete_auth(&t.app, "/api/v1/onboarding/documents/pan", &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let view = body_json(get_auth(&t.app, "/api/v1/onboarding", &token).await).await;
    assert_eq!(view["data"]["step_validity"]["documents"], false);
    assert_eq!(view["data"]["upload_slots"]["pan"]["state"], "empty");
}

#[tokio::test]
async fn profile_photo_upload_returns_its_key() {
    let t = build_test_app();
    let response = upload_auth(
        &t.app,
        "/api/v1/onboarding/photo",
        "me.jpg",
        b"jpeg",
        &worker_token(WORKER),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let key = body_json(response).await["data"]["profile_photo_key"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(key.ends_with("profile_photo.jpg"));
    assert!(t.storage.contains(&key));
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_flow_submits_and_locks_the_onboarding() {
    let t = build_test_app();
    let token = worker_token(WORKER);

    let response = put_json_auth(&t.app, "/api/v1/onboarding/steps/1", profile_body(), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    for ty in ["aadhaar_front", "aadhaar_back", "pan"] {
        let response = upload_auth(
            &t.app,
            &format!("/api/v1/onboarding/documents/{ty}"),
            &format!("{ty}.pdf"),
            b"%PDF",
            &token,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let response = put_json_auth(&t.app, "/api/v1/onboarding/steps/3", skills_body(), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        &t.app,
        "/api/v1/onboarding/submit",
        json!({ "terms_accepted": false }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = post_json_auth(
        &t.app,
        "/api/v1/onboarding/submit",
        json!({ "terms_accepted": true }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["status"], "pending_verification");
    assert_eq!(data["phase"], "submitted");
    assert_eq!(data["read_only"], true);
    assert!(data["submitted_at"].is_string());

    // The skills save was still debounced; submit flushed it.
    let saved = t.gateway.saves();
    assert!(saved
        .iter()
        .any(|s| matches!(s.data, workbridge_core::steps::StepData::Skills(_))));
    assert_eq!(t.gateway.audit_events().len(), 1);

    let response = put_json_auth(&t.app, "/api/v1/onboarding/steps/1", profile_body(), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "READ_ONLY");

    // A fresh session reopens on Review.
    let response = post_json_auth(&t.app, "/api/v1/onboarding", json!({}), &token).await;
    let data = &body_json(response).await["data"];
    assert_eq!(data["current_step"], "review");
    assert_eq!(data["can_submit"], false);
}
