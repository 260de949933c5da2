use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use exam_backend::{
    config::Config,
    database::memory::MemoryCandidateStore,
    middleware::auth::Claims,
    routes::build_router,
    services::{account_service::InMemoryAccountService, test_bank::StaticTestBank},
    AppState,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

const SECRET: &str = "test_secret_key";

fn app() -> Router {
    let config = Config {
        server_address: "127.0.0.1:0".into(),
        database_url: "postgres://unused".into(),
        database_max_connections: 1,
        jwt_secret: SECRET.into(),
        test_bank_url: "http://localhost".into(),
        test_bank_timeout_secs: 1,
    };
    let state = AppState::new(
        config,
        Arc::new(MemoryCandidateStore::new()),
        Arc::new(StaticTestBank::new()),
        Arc::new(InMemoryAccountService::new()),
    );
    build_router(state)
}

fn token(role: &str) -> String {
    let claims = Claims {
        sub: "admin-1".into(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        role: Some(role.into()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode token")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", bearer));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn admin_api_requires_an_admin_token() {
    let app = app();

    let (status, body) = send(&app, "GET", "/api/admin/statistics", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_authorization");

    let (status, _) = send(&app, "GET", "/api/admin/statistics", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let candidate_token = token("candidate");
    let (status, body) = send(
        &app,
        "GET",
        "/api/admin/statistics",
        Some(&candidate_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let admin = token("admin");
    let (status, body) = send(&app, "GET", "/api/admin/statistics", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_candidates"], 0);
}

#[tokio::test]
async fn create_candidate_validates_payload() {
    let app = app();
    let admin = token("admin");

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/candidates",
        Some(&admin),
        Some(json!({ "full_name": "Eve", "email": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn candidate_journey_over_http() {
    let app = app();
    let admin = token("admin");

    let (status, created) = send(
        &app,
        "POST",
        "/api/admin/candidates",
        Some(&admin),
        Some(json!({
            "full_name": "Frank Example",
            "email": "Frank@Example.com",
            "payment_confirmed": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let exam_id = created["candidate"]["exam_id"].as_str().unwrap().to_string();
    let candidate_id = created["candidate"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["login"], exam_id.as_str());
    assert_eq!(created["password"].as_str().unwrap().len(), 10);
    assert_eq!(created["candidate"]["email"], "frank@example.com");
    assert_eq!(created["candidate"]["status"], "not_started");

    let (status, verified) = send(
        &app,
        "POST",
        "/api/exam/verify",
        None,
        Some(json!({ "exam_id": exam_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], true);

    let (status, session) = send(
        &app,
        "POST",
        "/api/exam/start",
        None,
        Some(json!({ "exam_id": exam_id, "fingerprint": "fp-42" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["status"], "in_progress");
    assert_eq!(session["resumed"], false);

    let writing_uri = format!("/api/exam/{}/modules/writing", exam_id);
    let writing = json!({ "band": 6.5, "task1": "Task one", "task2": "Task two" });
    let (status, saved) = send(&app, "POST", &writing_uri, None, Some(writing.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["grading"], "unverified");
    assert_eq!(saved["scores"]["overall"], 6.5);

    let (status, _) = send(&app, "POST", &writing_uri, None, Some(writing)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/exam/{}/modules/speaking", exam_id),
        None,
        Some(json!({ "band": 6.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("speaking"));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/exam/{}/modules/reading", exam_id),
        None,
        Some(json!({ "band": 6.3 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let results_uri = format!("/api/exam/{}/results", exam_id);
    let (status, body) = send(&app, "GET", &results_uri, None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Exam is still in progress");

    let (status, sheet) = send(
        &app,
        "GET",
        &format!("/api/admin/candidates/{}/answers/writing", candidate_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sheet["answers"]["task1"], "Task one");

    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/api/exam/{}/violations", exam_id),
        None,
        Some(json!({ "violation_type": "dev_tools" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["action"], "terminated");
    assert_eq!(outcome["terminated"], true);

    let (status, body) = send(&app, "GET", &results_uri, None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Exam has not been completed");

    let (status, stats) = send(&app, "GET", "/api/admin/statistics", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["by_status"]["terminated"], 1);
    assert_eq!(stats["total_violations"], 1);

    let (status, reset) = send(
        &app,
        "POST",
        &format!("/api/admin/exams/{}/reset", exam_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reset["status"], "not_started");
    assert_eq!(reset["may_retake"], true);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/candidates/{}", candidate_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, verified) = send(
        &app,
        "POST",
        "/api/exam/verify",
        None,
        Some(json!({ "exam_id": exam_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], false);
    assert_eq!(verified["message"], "Invalid Exam ID");
}

#[tokio::test]
async fn admin_corrections_over_http() {
    let app = app();
    let admin = token("admin");

    let (_, created) = send(
        &app,
        "POST",
        "/api/admin/candidates",
        Some(&admin),
        Some(json!({
            "full_name": "Grace Example",
            "email": "grace@example.com",
            "payment_confirmed": true
        })),
    )
    .await;
    let exam_id = created["candidate"]["exam_id"].as_str().unwrap().to_string();
    let candidate_id = created["candidate"]["id"].as_str().unwrap().to_string();

    send(&app, "POST", "/api/exam/start", None, Some(json!({ "exam_id": exam_id }))).await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/exam/{}/complete", exam_id),
        None,
        Some(json!({
            "listening": { "band": 6.0, "raw_score": 25, "total_questions": 40 },
            "reading": { "band": 7.0 },
            "writing": 7.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/admin/candidates/{}/modules/listening/score", candidate_id),
        Some(&admin),
        Some(json!({ "band": 8.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["scores"]["overall"], 7.5);

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/api/admin/candidates/{}/scores", candidate_id),
        Some(&admin),
        Some(json!({ "writing": 5.0, "remarks": "Moderated" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["scores"]["overall"], 6.5);
    assert_eq!(updated["admin_remarks"], "Moderated");

    let (status, published) = send(
        &app,
        "POST",
        &format!("/api/admin/candidates/{}/publish", candidate_id),
        Some(&admin),
        Some(json!({ "publish": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["results_published"], true);

    let (status, results) = send(
        &app,
        "GET",
        &format!("/api/exam/{}/results", exam_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["published"], true);
    assert_eq!(results["remarks"], "Moderated");
    assert_eq!(results["scores"]["writing"]["overall_band"], 5.0);

    let (status, reset) = send(
        &app,
        "POST",
        &format!("/api/admin/candidates/{}/modules/reading/reset", candidate_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reset["status"], "in_progress");
    assert_eq!(reset["scores"]["overall"], 6.5);

    let (status, listed) = send(
        &app,
        "GET",
        "/api/admin/candidates?status=in_progress",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
