use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use tally_api::{AppStateInner, router};
use tally_auth::{ManualClock, PasswordScheme};
use tally_db::Database;

fn app() -> (Router, Arc<ManualClock>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()));
    let state = Arc::new(AppStateInner::new(
        db,
        clock.clone(),
        Duration::hours(24),
        PasswordScheme::LegacySha256,
    ));
    (router(state), clock)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register_and_login(app: &Router, username: &str, email: &str, password: &str) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "identifier": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let (app, _) = app();
    register_and_login(&app, "alice", "a@x.com", "pw1").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "bob", "email": "a@x.com", "password": "pw2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email is already registered");
}

#[tokio::test]
async fn fresh_session_reports_full_lifetime() {
    let (app, _) = app();
    let token = register_and_login(&app, "alice", "a@x.com", "pw1").await;

    let (status, body) = send(&app, "GET", "/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "valid");
    assert_eq!(body["message"], "valid, 24.0 hours remaining");
    assert_eq!(body["remaining_seconds"], 86_400);
}

#[tokio::test]
async fn bad_password_and_unknown_user_get_same_answer() {
    let (app, _) = app();
    register_and_login(&app, "alice", "a@x.com", "pw1").await;

    let (s1, b1) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "identifier": "alice", "password": "nope" })),
    )
    .await;
    let (s2, b2) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "mallory", "password": "pw1" })),
    )
    .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1, b2);
}

#[tokio::test]
async fn expenses_stay_with_their_owner() {
    let (app, _) = app();
    let alice = register_and_login(&app, "alice", "a@x.com", "pw1").await;
    let bob = register_and_login(&app, "bob", "b@x.com", "pw2").await;

    let (status, coffee) = send(
        &app,
        "POST",
        "/expenses",
        Some(&alice),
        Some(json!({ "description": "coffee", "amount": 4.50, "category": "Food" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let coffee_id = coffee["id"].as_str().unwrap().to_string();

    let (_, bobs) = send(&app, "GET", "/expenses", Some(&bob), None).await;
    assert_eq!(bobs, json!([]));

    let (_, found) = send(&app, "GET", "/expenses?q=coff", Some(&bob), None).await;
    assert_eq!(found, json!([]));

    let (status, _) = send(&app, "GET", &format!("/expenses/{}", coffee_id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/expenses?description=coffee", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PATCH",
        "/expenses",
        Some(&bob),
        Some(json!({ "description": "coffee", "amount": 0.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, mine) =
        send(&app, "GET", &format!("/expenses/{}", coffee_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["amount"], 4.5);
    assert_eq!(mine["date"], "2026-05-04");
}

#[tokio::test]
async fn range_and_summary() {
    let (app, _) = app();
    let token = register_and_login(&app, "alice", "a@x.com", "pw1").await;

    for (description, amount, category) in
        [("coffee", 4.5, "Food"), ("lunch", 10.0, "Food"), ("bus", 2.5, "Transport")]
    {
        send(
            &app,
            "POST",
            "/expenses",
            Some(&token),
            Some(json!({ "description": description, "amount": amount, "category": category })),
        )
        .await;
    }

    let (status, range) = send(
        &app,
        "GET",
        "/expenses/range?start=2026-05-01&end=2026-05-31&category=Food",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(range.as_array().unwrap().len(), 2);

    let (status, summary) = send(
        &app,
        "GET",
        "/expenses/summary?start=2026-05-01&end=2026-05-31",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["grand_total"], 17.0);
    assert_eq!(summary["expense_count"], 3);
    assert_eq!(summary["groups"][0]["category"], "Food");
    assert_eq!(summary["groups"][0]["total"], 14.5);
    assert_eq!(summary["groups"][1]["category"], "Transport");

    let (status, _) = send(
        &app,
        "GET",
        "/expenses/summary?start=2026-05-31&end=2026-05-01",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_forged_and_expired_tokens_are_rejected() {
    let (app, clock) = app();
    let token = register_and_login(&app, "alice", "a@x.com", "pw1").await;

    let (status, body) = send(&app, "GET", "/expenses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing bearer token");

    let (status, body) = send(&app, "GET", "/expenses", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid session");

    clock.advance(Duration::hours(24) + Duration::seconds(1));

    let (status, body) = send(&app, "GET", "/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "expired");

    let (status, body) = send(&app, "GET", "/expenses", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Session expired");

    let (_, body) = send(&app, "GET", "/expenses", Some(&token), None).await;
    assert_eq!(body["error"], "Invalid session");
}

#[tokio::test]
async fn logout_twice() {
    let (app, _) = app();
    let token = register_and_login(&app, "alice", "a@x.com", "pw1").await;

    let (status, _) = send(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid session");
}

#[tokio::test]
async fn negative_amount_is_a_bad_request() {
    let (app, _) = app();
    let token = register_and_login(&app, "alice", "a@x.com", "pw1").await;

    let (status, _) = send(
        &app,
        "POST",
        "/expenses",
        Some(&token),
        Some(json!({ "description": "refund", "amount": -3.0, "category": "Food" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_input_gets_a_json_error_body() {
    let (app, _) = app();
    let token = register_and_login(&app, "alice", "a@x.com", "pw1").await;

    let (status, body) = send(
        &app,
        "GET",
        "/expenses/range?start=yesterday&end=2026-05-31",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, "GET", "/expenses/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // well-formed JSON, wrong shape
    let (status, body) = send(
        &app,
        "POST",
        "/expenses",
        Some(&token),
        Some(json!({ "description": "coffee" })),
    )
    .await;
    assert!(status.is_client_error());
    assert!(body["error"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}
