//! HTTP surface: auth, envelopes and request shapes.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::*;
use laborhub_core::domains::users::User;
use serde_json::{json, Value};
use test_context::test_context;
use tower::ServiceExt;

async fn call(
    ctx: &TestHarness,
    method: Method,
    uri: &str,
    as_user: Option<&User>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = as_user {
        request = request.header(
            header::AUTHORIZATION,
            format!("Bearer {}", ctx.token_for(user)),
        );
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = ctx.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[test_context(TestHarness)]
#[tokio::test]
async fn health_reports_store_and_queue(ctx: &TestHarness) {
    let (status, body) = call(ctx, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "ok");
    assert_eq!(body["dispatch_queue"]["pending"], 0);
    assert!(body.get("connection_pool").is_none());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn endpoints_require_a_token(ctx: &TestHarness) {
    let (status, body) = call(
        ctx,
        Method::POST,
        "/recruits",
        None,
        Some(json!({ "job_ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(ctx, Method::GET, "/messages", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn post_recruits_returns_one_record_per_job(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let job = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let worker = create_worker_at(store, "5550000001", NEARBY);

    let (status, body) = call(
        ctx,
        Method::POST,
        "/recruits",
        Some(&recruiter),
        Some(json!({
            "job_ids": [job.id],
            "broadcast_radius": 5,
            "phone_numbers": ["555-999-9999"]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let recruits = body["recruits"].as_array().unwrap();
    assert_eq!(recruits.len(), 1);
    assert_eq!(recruits[0]["request"]["job_id"], json!(job.id));
    assert_eq!(recruits[0]["recruited_worker_user_ids"], json!([worker.id]));

    let (status, body) = call(
        ctx,
        Method::GET,
        "/recruits?job_id=",
        Some(&recruiter),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recruits"].as_array().unwrap().len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn workers_cannot_recruit(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let job = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let worker = create_worker_at(store, "5550000001", NEARBY);

    let (status, body) = call(
        ctx,
        Method::POST,
        "/recruits",
        Some(&worker),
        Some(json!({ "job_ids": [job.id] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["msg"], "Only company users can recruit");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn malformed_json_gets_the_failure_envelope(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);

    let (status, body) = call(
        ctx,
        Method::POST,
        "/messages",
        Some(&recruiter),
        Some(json!({ "type": "message" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(!body["msg"].as_str().unwrap().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn sender_must_be_the_signed_in_user(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let worker = create_worker_at(store, "5550000001", NEARBY);

    let (status, body) = call(
        ctx,
        Method::POST,
        "/messages",
        Some(&worker),
        Some(json!({
            "job_id": "",
            "type": "message",
            "sender": { "user_id": recruiter.id, "company_id": company.id },
            "receivers": [{ "user_id": worker.id }],
            "message": { "en": "Hi", "es": "" },
            "auto_translate": false
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(store.messages().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn send_list_and_read_round_trip(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let worker = create_worker_at(store, "5550000001", NEARBY);

    let (status, body) = call(
        ctx,
        Method::POST,
        "/messages",
        Some(&recruiter),
        Some(json!({
            "job_id": "",
            "type": "message",
            "sender": { "user_id": recruiter.id, "company_id": company.id },
            "receivers": [worker.id],
            "receivers_phone_numbers": ["5559999999"],
            "message": { "en": "Orientation at 9", "es": "" },
            "auto_translate": true
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let message = &body["messages"][0];
    assert_eq!(message["type"], "message");
    assert_eq!(message["message"]["es"], "[es] Orientation at 9");
    assert_eq!(message["receivers"].as_array().unwrap().len(), 2);
    let message_id = message["id"].as_str().unwrap().to_string();

    // Sending returns before any SMS goes out
    assert_eq!(ctx.deps.dispatch_queue.queued().len(), 2);

    let (status, body) = call(ctx, Method::GET, "/messages", Some(&worker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"][0]["receivers"][0]["status"], "new");

    let (status, body) = call(
        ctx,
        Method::POST,
        &format!("/messages/{}/read", message_id),
        Some(&worker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["receivers"][0]["status"], "read");
    assert_eq!(body["message"]["receivers"][1]["status"], "new");
}
