// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_permission;

use crate::services::directory::DoctorDirectoryService;

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub clinic_id: i64,
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "doctors.read")?;
    let token = auth.token();

    let directory = DoctorDirectoryService::new(&state);
    let doctors = directory
        .list_clinic_doctors(query.clinic_id, token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "doctors": doctors,
        "count": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
    Extension(user): Extension<User>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    require_permission(&user, "doctors.read")?;
    let token = auth.token();

    let directory = DoctorDirectoryService::new(&state);
    let doctor = directory
        .get_doctor(doctor_id, token)
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!(doctor)))
}
