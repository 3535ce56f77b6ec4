// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_permission;

use crate::models::{
    AppointmentError, AppointmentSearchQuery, AvailabilityQuery, AvailabilityResponse,
    CancelAppointmentRequest, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::store::AppointmentStore;

const DEFAULT_NUM_ALTERNATIVES: usize = 3;
const DEFAULT_DAYS_RANGE: i64 = 7;

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// Slot check for a (clinic, doctor, resource) triple. When the requested
/// interval is taken, the response carries alternative slots of the same
/// duration. The check is advisory: nothing reserves the slot between this
/// call and the booking that follows it.
#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    require_permission(&user, "appointments.read")?;
    let token = auth.token();

    let service = AvailabilityService::new(&state);

    let is_available = service
        .is_slot_available(
            query.clinic_id,
            query.doctor_id,
            query.resource_id,
            query.start_time,
            query.end_time,
            token,
        )
        .await
        .map_err(availability_failure)?;

    if is_available {
        return Ok(Json(AvailabilityResponse {
            is_available: true,
            message: "The requested time slot is available".to_string(),
            alternative_slots: vec![],
        }));
    }

    let alternative_slots = service
        .find_alternatives(
            query.clinic_id,
            query.doctor_id,
            query.resource_id,
            query.start_time,
            query.end_time,
            query.num_alternatives.unwrap_or(DEFAULT_NUM_ALTERNATIVES),
            query.days_range.unwrap_or(DEFAULT_DAYS_RANGE),
            query.check_other_doctors.unwrap_or(true),
            token,
        )
        .await
        .map_err(availability_failure)?;

    let message = if alternative_slots.is_empty() {
        "The requested time slot is not available. No alternative slots were found in the coming days."
    } else {
        "The requested time slot is not available. Alternative slots were found."
    };

    Ok(Json(AvailabilityResponse {
        is_available: false,
        message: message.to_string(),
        alternative_slots,
    }))
}

fn availability_failure(e: AppointmentError) -> AppError {
    AppError::Internal(format!("Availability check failed: {}", e))
}

// ==============================================================================
// APPOINTMENT CRUD
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "appointments.create")?;
    let token = auth.token();

    let store = AppointmentStore::new(&state);
    let appointment = store
        .create(request, user.id.parse().ok(), token)
        .await
        .map_err(|e| match e {
            AppointmentError::InvalidTime(msg) => AppError::BadRequest(msg),
            AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment created successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "appointments.read")?;
    let token = auth.token();

    let store = AppointmentStore::new(&state);
    let appointment = store.get(appointment_id, token).await.map_err(|e| match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        _ => AppError::Internal(e.to_string()),
    })?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "appointments.read")?;
    let token = auth.token();

    let store = AppointmentStore::new(&state);
    let appointments = store
        .search(query, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "appointments": appointments,
        "count": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "appointments.update")?;
    let token = auth.token();

    if let (Some(start_time), Some(end_time)) = (request.start_time, request.end_time) {
        if end_time <= start_time {
            return Err(AppError::BadRequest(
                "end_time must be after start_time".to_string(),
            ));
        }
    }

    let store = AppointmentStore::new(&state);
    let appointment = store
        .update(appointment_id, request, user.id.parse().ok(), token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::InvalidTime(msg) => AppError::BadRequest(msg),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "appointments.cancel")?;
    let token = auth.token();

    let cancellation_reason = request.and_then(|Json(r)| r.cancellation_reason);

    let store = AppointmentStore::new(&state);
    store
        .cancel(appointment_id, cancellation_reason, user.id.parse().ok(), token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "appointments.delete")?;
    let token = auth.token();

    let store = AppointmentStore::new(&state);
    store
        .soft_delete(appointment_id, token)
        .await
        .map_err(|e| match e {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            _ => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted successfully"
    })))
}
