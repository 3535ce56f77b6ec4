use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::models::{CreatePatientRequest, PatientError};
use patient_cell::router::patient_routes;
use patient_cell::services::patient::PatientService;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

fn config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

fn create_request(email: &str) -> CreatePatientRequest {
    CreatePatientRequest {
        clinic_id: 1,
        first_name: "Ana".to_string(),
        last_name: "Soto".to_string(),
        email: Some(email.to_string()),
        phone_number: None,
        date_of_birth: "1990-01-01".parse().unwrap(),
        address: None,
        emergency_contact_name: None,
        emergency_contact_phone: None,
        insurance_provider: None,
        insurance_policy_number: None,
    }
}

#[tokio::test]
async fn create_patient_rejects_a_duplicate_email_within_the_clinic() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("clinic_id", "eq.1"))
        .and(query_param("email", "eq.ana@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::patient_row(9, 1, "ana@example.com")
        ])))
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config_for(&mock_server));
    let result = service
        .create_patient(create_request("ana@example.com"), "test-token")
        .await;

    assert!(matches!(result, Err(PatientError::DuplicateEmail(_))));
}

#[tokio::test]
async fn create_patient_inserts_when_the_email_is_unused() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::patient_row(12, 1, "ana@example.com")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config_for(&mock_server));
    let patient = service
        .create_patient(create_request("ana@example.com"), "test-token")
        .await
        .unwrap();

    assert_eq!(patient.id, 12);
    assert_eq!(patient.clinic_id, 1);
}

#[tokio::test]
async fn soft_deleted_patients_are_invisible_to_get() {
    let mock_server = MockServer::start().await;

    // The store always sends the not-deleted predicate, so the soft-deleted
    // row simply never comes back.
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = PatientService::new(&config_for(&mock_server));
    let result = service.get_patient(12, "test-token").await;

    assert!(matches!(result, Err(PatientError::NotFound)));
}

#[tokio::test]
async fn patient_endpoints_are_permission_gated() {
    let mock_server = MockServer::start().await;
    let config = config_for(&mock_server);
    let user = TestUser::unprivileged("guest@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = patient_routes(Arc::new(config));

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
async fn list_patients_endpoint_returns_clinic_roster() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::patient_row(12, 1, "ana@example.com"),
            MockRows::patient_row(13, 1, "luis@example.com")
        ])))
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let user = TestUser::receptionist("desk@clinic.example");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));
    let app = patient_routes(Arc::new(config));

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
    assert_eq!(value["count"], json!(2));
}
