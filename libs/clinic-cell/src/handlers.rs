// libs/clinic-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
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
    ClinicError, CreateClinicRequest, CreateResourceRequest, UpdateClinicRequest,
    UpdateResourceRequest,
};
use crate::services::clinic::ClinicService;
use crate::services::resource::ResourceService;

fn map_clinic_error(e: ClinicError) -> AppError {
    match e {
        ClinicError::ClinicNotFound => AppError::NotFound("Clinic not found".to_string()),
        ClinicError::ResourceNotFound => AppError::NotFound("Resource not found".to_string()),
        ClinicError::DatabaseError(msg) => AppError::Internal(msg),
    }
}

// ==============================================================================
// CLINICS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_clinic(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "clinics.create")?;

    let service = ClinicService::new(&state);
    let clinic = service
        .create_clinic(request, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "success": true,
        "clinic": clinic,
        "message": "Clinic created successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "clinics.read")?;

    let service = ClinicService::new(&state);
    let clinic = service
        .get_clinic(clinic_id, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn list_clinics(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "clinics.read")?;

    let service = ClinicService::new(&state);
    let clinics = service
        .list_clinics(auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "clinics": clinics,
        "count": clinics.len()
    })))
}

#[axum::debug_handler]
pub async fn update_clinic(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "clinics.update")?;

    let service = ClinicService::new(&state);
    let clinic = service
        .update_clinic(clinic_id, request, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "success": true,
        "clinic": clinic,
        "message": "Clinic updated successfully"
    })))
}

// ==============================================================================
// RESOURCES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_resource(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateResourceRequest>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "resources.create")?;

    let service = ResourceService::new(&state);
    let resource = service
        .create_resource(request, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "success": true,
        "resource": resource,
        "message": "Resource created successfully"
    })))
}

#[axum::debug_handler]
pub async fn list_clinic_resources(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "resources.read")?;

    let service = ResourceService::new(&state);
    let resources = service
        .list_clinic_resources(clinic_id, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "resources": resources,
        "count": resources.len()
    })))
}

#[axum::debug_handler]
pub async fn get_resource(
    State(state): State<Arc<AppConfig>>,
    Path(resource_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "resources.read")?;

    let service = ResourceService::new(&state);
    let resource = service
        .get_resource(resource_id, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!(resource)))
}

#[axum::debug_handler]
pub async fn update_resource(
    State(state): State<Arc<AppConfig>>,
    Path(resource_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateResourceRequest>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "resources.update")?;

    let service = ResourceService::new(&state);
    let resource = service
        .update_resource(resource_id, request, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "success": true,
        "resource": resource,
        "message": "Resource updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_resource(
    State(state): State<Arc<AppConfig>>,
    Path(resource_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "resources.delete")?;

    let service = ResourceService::new(&state);
    service
        .soft_delete_resource(resource_id, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Resource deleted successfully"
    })))
}
