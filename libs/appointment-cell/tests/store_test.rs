use assert_matches::assert_matches;
use chrono::NaiveDateTime;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    AppointmentError, AppointmentSearchQuery, AppointmentStatus, CreateAppointmentRequest,
};
use appointment_cell::services::store::AppointmentStore;
use shared_config::AppConfig;
use shared_utils::test_utils::{MockRows, TestConfig};

const TOKEN: &str = "test-token";

fn dt(s: &str) -> NaiveDateTime {
    s.parse().unwrap()
}

fn config_for(mock_server: &MockServer) -> AppConfig {
    let mut config = TestConfig::default().to_app_config();
    config.supabase_url = mock_server.uri();
    config
}

#[tokio::test]
async fn find_overlapping_sends_the_full_scoping_predicate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("clinic_id", "eq.1"))
        .and(query_param("primary_doctor_id", "eq.5"))
        .and(query_param("resource_id", "eq.2"))
        .and(query_param("start_time", "lt.2024-01-10T09:45:00"))
        .and(query_param("end_time", "gt.2024-01-10T09:15:00"))
        .and(query_param("status", "not.in.(Cancelled,NoShow)"))
        .and(query_param("deleted_at", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = AppointmentStore::new(&config_for(&mock_server));
    let overlapping = store
        .find_overlapping(1, 5, 2, dt("2024-01-10T09:15:00"), dt("2024-01-10T09:45:00"), TOKEN)
        .await
        .unwrap();

    assert!(overlapping.is_empty());
}

#[tokio::test]
async fn find_overlapping_filters_non_blocking_rows_after_decoding() {
    let mock_server = MockServer::start().await;

    // A coarse range query can return rows the precise filter must discard:
    // a cancelled appointment and a touching-but-not-overlapping one.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment_row(
                1, 1, 5, Some(2),
                "2024-01-10T09:00:00", "2024-01-10T09:30:00",
                "Cancelled"
            ),
            MockRows::appointment_row(
                2, 1, 5, Some(2),
                "2024-01-10T08:30:00", "2024-01-10T09:15:00",
                "Scheduled"
            ),
            MockRows::appointment_row(
                3, 1, 5, Some(2),
                "2024-01-10T09:20:00", "2024-01-10T09:50:00",
                "Confirmed"
            )
        ])))
        .mount(&mock_server)
        .await;

    let store = AppointmentStore::new(&config_for(&mock_server));
    let overlapping = store
        .find_overlapping(1, 5, 2, dt("2024-01-10T09:15:00"), dt("2024-01-10T09:45:00"), TOKEN)
        .await
        .unwrap();

    assert_eq!(overlapping.len(), 1);
    assert_eq!(overlapping[0].id, 3);
}

#[tokio::test]
async fn create_rejects_an_inverted_interval_without_touching_storage() {
    let mock_server = MockServer::start().await;
    let store = AppointmentStore::new(&config_for(&mock_server));

    let request = CreateAppointmentRequest {
        clinic_id: 1,
        patient_id: 1,
        primary_doctor_id: 5,
        resource_id: Some(2),
        start_time: dt("2024-01-10T10:00:00"),
        end_time: dt("2024-01-10T09:00:00"),
        status: None,
        notes: None,
    };

    let result = store.create(request, Some(101), TOKEN).await;
    assert_matches!(result, Err(AppointmentError::InvalidTime(_)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_records_the_reason_and_frees_the_slot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment_row(
                42, 1, 5, Some(2),
                "2024-01-10T09:00:00", "2024-01-10T09:30:00",
                "Scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;

    let cancelled_row = {
        let mut row = MockRows::appointment_row(
            42, 1, 5, Some(2),
            "2024-01-10T09:00:00", "2024-01-10T09:30:00",
            "Cancelled",
        );
        row["cancellation_reason"] = json!("patient request");
        row
    };

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cancelled_row])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = AppointmentStore::new(&config_for(&mock_server));
    let cancelled = store
        .cancel(42, Some("patient request".to_string()), Some(101), TOKEN)
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(!cancelled.status.occupies_slot());
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("patient request"));
}

#[tokio::test]
async fn get_reports_missing_rows_as_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = AppointmentStore::new(&config_for(&mock_server));
    let result = store.get(999, TOKEN).await;
    assert_matches!(result, Err(AppointmentError::NotFound));
}

#[tokio::test]
async fn search_passes_filters_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("clinic_id", "eq.1"))
        .and(query_param("status", "eq.Scheduled"))
        .and(query_param("deleted_at", "is.null"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment_row(
                7, 1, 5, Some(2),
                "2024-01-10T09:00:00", "2024-01-10T09:30:00",
                "Scheduled"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = AppointmentStore::new(&config_for(&mock_server));
    let appointments = store
        .search(
            AppointmentSearchQuery {
                clinic_id: Some(1),
                status: Some(AppointmentStatus::Scheduled),
                limit: Some(50),
                ..Default::default()
            },
            TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].id, 7);
}
