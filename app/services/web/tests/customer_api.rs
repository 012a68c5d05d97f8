use app_config::{AppConfig, StorageKind};
use app_data::MemoryStore;
use app_log::LogLevel;
use app_schema::customer::Customer;
use app_state::AppState;
use app_web::router;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let config = AppConfig {
        backend_bind: "127.0.0.1:0".into(),
        log_level: LogLevel::Off,
        storage: StorageKind::Memory,
        pg_connection: 1,
        asset_path: "../../assets".into(),
    };
    router(Arc::new(AppState::new(config, MemoryStore::<Customer>::new())))
}

fn customer(tax_id: &str, email: &str) -> Value {
    json!({
        "legalName": "Acme SA",
        "taxId": tax_id,
        "customerType": "Legal",
        "legalRepresentative": "Ana Ruiz",
        "contactEmail": email,
        "contactPhone": "555-0100",
        "address": "1 Main St",
        "city": "Lima",
        "country": "Peru",
        "active": true
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn crud_round_trip() {
    let app = app();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/customers",
        Some(customer("TX-1", "ops@acme.test")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["isSuccess"], true);
    assert_eq!(created["data"]["id"], 1);
    assert!(created["data"]["registeredAt"].is_string());

    let (status, fetched) = send(&app, Method::GET, "/api/customers/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["taxId"], "TX-1");

    let mut edit = customer("TX-1", "ops@acme.test");
    edit["city"] = json!("Cusco");
    let (status, updated) = send(&app, Method::PUT, "/api/customers/1", Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["city"], "Cusco");
    assert_eq!(
        updated["data"]["registeredAt"],
        created["data"]["registeredAt"]
    );

    let (status, deleted) = send(&app, Method::DELETE, "/api/customers/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["data"], true);

    let (status, missing) = send(&app, Method::GET, "/api/customers/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["isSuccess"], false);
    assert_eq!(missing["data"], Value::Null);
}

#[tokio::test]
async fn duplicate_tax_id_is_a_bad_request() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/api/customers",
        Some(customer("TX-1", "a@acme.test")),
    )
    .await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/customers",
        Some(customer("TX-1", "b@acme.test")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["responseCode"], 400);

    let (_, list) = send(&app, Method::GET, "/api/customers", None).await;
    assert_eq!(list["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn malformed_input_becomes_an_envelope() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/customers")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Invalid request");

    let mut wrong_type = customer("TX-1", "ops@acme.test");
    wrong_type["active"] = json!("yes");
    let (status, body) = send(&app, Method::POST, "/api/customers", Some(wrong_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request");

    let (status, body) = send(&app, Method::GET, "/api/customers/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request");

    let (status, body) = send(&app, Method::GET, "/api/customers/registered?from=yesterday", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request");
}

#[tokio::test]
async fn missing_body_is_no_data_received() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/api/customers",
        Some(customer("TX-1", "ops@acme.test")),
    )
    .await;

    for (method, uri) in [
        (Method::POST, "/api/customers"),
        (Method::PUT, "/api/customers/1"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["responseCode"], 400);
        assert_eq!(body["isSuccess"], false);
        assert_eq!(body["message"], "No data received");
        assert_eq!(body["data"], Value::Null);
    }

    let (_, stored) = send(&app, Method::GET, "/api/customers/1", None).await;
    assert_eq!(stored["data"]["taxId"], "TX-1");
}

#[tokio::test]
async fn field_errors_are_listed() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/customers",
        Some(json!({ "legalName": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().cloned().unwrap_or_default();
    assert!(errors.len() >= 8);
    assert!(errors.contains(&json!("taxId: Tax id is required")));
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = app();
    let request = Request::builder()
        .uri("/api/customers/9")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("trace-me")
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["traceId"], "trace-me");
}

#[tokio::test]
async fn lookups_and_validation_endpoints() {
    let app = app();
    send(
        &app,
        Method::POST,
        "/api/customers",
        Some(customer("TX-1", "a@acme.test")),
    )
    .await;

    let (_, body) = send(&app, Method::GET, "/api/customers/by-tax-id/TX-1", None).await;
    assert_eq!(body["data"]["contactEmail"], "a@acme.test");

    let (_, body) = send(&app, Method::GET, "/api/customers/by-city/Lima", None).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (_, body) = send(&app, Method::GET, "/api/customers/by-name?q=Acme", None).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/customers/search?city=Lima&active=true",
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (_, body) = send(&app, Method::GET, "/api/customers/validate-tax-id?taxId=TX-1", None).await;
    assert_eq!(body["data"], false);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/customers/validate-tax-id?taxId=TX-1&excludeId=1",
        None,
    )
    .await;
    assert_eq!(body["data"], true);

    let (_, body) = send(&app, Method::GET, "/api/customers/1/summary", None).await;
    assert_eq!(body["data"], json!({ "id": 1, "legalName": "Acme SA", "contactEmail": "a@acme.test" }));
}

#[tokio::test]
async fn export_is_newline_delimited_json() {
    let app = app();
    for (tax_id, email) in [("TX-1", "a@acme.test"), ("TX-2", "b@acme.test")] {
        send(&app, Method::POST, "/api/customers", Some(customer(tax_id, email))).await;
    }
    let request = Request::builder()
        .uri("/api/customers/export")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/x-ndjson"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let tax_ids: Vec<String> = text
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["taxId"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(tax_ids, vec!["TX-1", "TX-2"]);
}

#[tokio::test]
async fn admin_page_and_ping() {
    let app = app();
    let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder().uri("/customer").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("customer-form"));
}
