use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use backend_client::InMemoryBackend;
use chrono::Utc;
use configuration::{AuthConfig, ExportConfig};
use core_types::{Profile, Role};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use web_server::{router, AppState};

struct Fixture {
    backend: InMemoryBackend,
    app: Router,
    operator: Profile,
    operator_token: String,
    admin: Profile,
    admin_token: String,
}

fn fixture() -> Fixture {
    let backend = InMemoryBackend::with_metrics(dec!(100), dec!(0));
    let operator = backend.add_user("Ana", Role::Operator);
    let admin = backend.add_user("Paula", Role::Admin);
    let operator_token = backend.issue_token(operator.id);
    let admin_token = backend.issue_token(admin.id);

    let state = AppState::new(
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        AuthConfig::default(),
        ExportConfig::default(),
    );
    Fixture { app: router(Arc::new(state)), backend, operator, operator_token, admin, admin_token }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, req).await;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn health_needs_no_token() {
    let f = fixture();
    let (status, body) = send(&f.app, request("GET", "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn missing_or_unknown_token_is_unauthorized() {
    let f = fixture();
    let (status, body) = send_json(&f.app, request("GET", "/api/ranking", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send_json(&f.app, request("GET", "/api/ranking", Some("forged"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ranking_reports_the_callers_standing() {
    let f = fixture();
    f.backend.add_order(f.operator.id, dec!(1234.565), Utc::now());

    let (status, body) = send_json(&f.app, request("GET", "/api/ranking", Some(&f.operator_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);
    assert_eq!(body["entries"][0]["score"], json!("1234.57"));
    assert_eq!(body["me"]["status"], json!("ranked"));
    assert_eq!(body["me"]["position"], json!(1));
}

#[tokio::test]
async fn invalid_month_is_a_bad_request() {
    let f = fixture();
    let (status, _) = send_json(
        &f.app,
        request("GET", "/api/ranking?year=2024&month=13", Some(&f.operator_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn orders_round_trip_through_the_api() {
    let f = fixture();
    let new_order = json!({
        "clientCode": "C-100",
        "product": "LCI",
        "volume": "50000",
        "revenue": "250.00"
    });
    let (status, created) =
        send_json(&f.app, request("POST", "/api/orders", Some(&f.operator_token), Some(new_order))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, listed) = send_json(&f.app, request("GET", "/api/orders", Some(&f.operator_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["operatorName"], json!("Ana"));

    let uri = format!("/api/orders/{id}");
    let (status, _) = send(&f.app, request("DELETE", &uri, Some(&f.operator_token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&f.app, request("DELETE", &uri, Some(&f.operator_token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_routes_are_forbidden_to_operators() {
    let f = fixture();
    let (status, _) = send_json(&f.app, request("GET", "/api/users", Some(&f.operator_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = send_json(&f.app, request("GET", "/api/users", Some(&f.admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn metric_weight_updates_are_validated() {
    let f = fixture();
    let (_, metrics) = send_json(&f.app, request("GET", "/api/metrics", Some(&f.admin_token), None)).await;
    let id = metrics[0]["id"].as_i64().unwrap();
    let uri = format!("/api/metrics/{id}");

    let (status, _) =
        send_json(&f.app, request("PUT", &uri, Some(&f.admin_token), Some(json!({"weight": 150})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) =
        send_json(&f.app, request("PUT", &uri, Some(&f.admin_token), Some(json!({"weight": "70"})))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["weight"], json!("70"));
}

#[tokio::test]
async fn admin_promotes_but_cannot_self_demote() {
    let f = fixture();
    let promote = format!("/api/users/{}/promote", f.operator.id);
    let (status, profile) = send_json(&f.app, request("POST", &promote, Some(&f.admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["role"], json!("admin"));

    let demote_self = format!("/api/users/{}/demote", f.admin.id);
    let (status, _) = send_json(&f.app, request("POST", &demote_self, Some(&f.admin_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn export_is_a_csv_attachment() {
    let f = fixture();
    f.backend.add_order(f.operator.id, dec!(10), Utc::now());

    let response = f
        .app
        .clone()
        .oneshot(request("GET", "/api/export", Some(&f.admin_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"orders-"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[tokio::test]
async fn unreachable_backend_is_service_unavailable() {
    let f = fixture();
    f.backend.set_offline(true);
    let (status, body) = send_json(&f.app, request("GET", "/api/ranking", Some(&f.operator_token), None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("unavailable"));
}
