use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use doctor_cell::services::directory::DoctorDirectoryService;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

fn config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

#[tokio::test]
async fn list_clinic_doctors_scopes_by_clinic_and_activity() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("clinic_id", "eq.1"))
        .and(query_param("is_active", "is.true"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::doctor_row(5, 1, "Elena", "Ruiz"),
            MockRows::doctor_row(7, 1, "Maya", "Chen")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = DoctorDirectoryService::new(&config_for(&mock_server));
    let doctors = directory.list_clinic_doctors(1, "test-token").await.unwrap();

    assert_eq!(doctors.len(), 2);
    assert_eq!(doctors[0].full_name(), "Elena Ruiz");
    assert_eq!(doctors[1].id, 7);
}

#[tokio::test]
async fn list_doctors_endpoint_requires_the_read_capability() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let user = TestUser::unprivileged("guest@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = doctor_routes(Arc::new(config));

    let request = Request::builder()
        .method("GET")
        .uri("/?clinic_id=1")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_doctors_endpoint_returns_the_directory() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::doctor_row(5, 1, "Elena", "Ruiz")
        ])))
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let user = TestUser::receptionist("desk@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = doctor_routes(Arc::new(config));

    let request = Request::builder()
        .method("GET")
        .uri("/?clinic_id=1")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["count"], json!(1));
    assert_eq!(value["doctors"][0]["first_name"], json!("Elena"));
}
