use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinic_cell::models::{ClinicError, ResourceType, UpdateResourceRequest};
use clinic_cell::router::clinic_routes;
use clinic_cell::services::resource::ResourceService;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

fn config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

#[tokio::test]
async fn list_clinic_resources_scopes_by_clinic() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/resources"))
        .and(query_param("clinic_id", "eq.1"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::resource_row(2, 1, "Consulting Room A"),
            MockRows::resource_row(3, 1, "Consulting Room B")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = ResourceService::new(&config_for(&mock_server));
    let resources = service.list_clinic_resources(1, "test-token").await.unwrap();

    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].resource_type, ResourceType::Room);
    assert!(resources[0].is_schedulable);
}

#[tokio::test]
async fn update_resource_reports_missing_rows_as_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = ResourceService::new(&config_for(&mock_server));
    let result = service
        .update_resource(
            99,
            UpdateResourceRequest {
                name: Some("Renamed".to_string()),
                location: None,
                is_schedulable: None,
                is_active: None,
            },
            "test-token",
        )
        .await;

    assert!(matches!(result, Err(ClinicError::ResourceNotFound)));
}

#[tokio::test]
async fn clinic_listing_requires_the_read_capability() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let user = TestUser::unprivileged("guest@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = clinic_routes(Arc::new(config));

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn clinic_listing_returns_active_clinics() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::clinic_row(1, "Centro Vista Norte")
        ])))
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let user = TestUser::admin("admin@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = clinic_routes(Arc::new(config));

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["count"], json!(1));
    assert_eq!(value["clinics"][0]["name"], json!("Centro Vista Norte"));
}
