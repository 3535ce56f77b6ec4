use chrono::{NaiveDateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::query::TableQuery;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    CreateAppointmentRequest, UpdateAppointmentRequest,
};

/// Statuses that do not hold their slot; excluded from every overlap query.
const NON_BLOCKING_STATUSES: [&str; 2] = ["Cancelled", "NoShow"];

pub struct AppointmentStore {
    supabase: SupabaseClient,
}

impl AppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// All active appointments for the exact (clinic, doctor, resource)
    /// triple whose interval overlaps [start_time, end_time). The range
    /// predicate narrows the result server-side; the precise half-open
    /// overlap and status checks run on the decoded rows.
    pub async fn find_overlapping(
        &self,
        clinic_id: i64,
        doctor_id: i64,
        resource_id: i64,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = TableQuery::new("appointments")
            .eq("clinic_id", clinic_id)
            .eq("primary_doctor_id", doctor_id)
            .eq("resource_id", resource_id)
            .lt("start_time", fmt_ts(end_time))
            .gt("end_time", fmt_ts(start_time))
            .not_in("status", &NON_BLOCKING_STATUSES)
            .active()
            .order("start_time.asc")
            .path();

        let appointments = self.fetch(&path, auth_token).await?;

        Ok(appointments
            .into_iter()
            .filter(|apt| apt.status.occupies_slot() && apt.overlaps(start_time, end_time))
            .collect())
    }

    pub async fn create(
        &self,
        request: CreateAppointmentRequest,
        created_by_user_id: Option<i64>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if request.end_time <= request.start_time {
            return Err(AppointmentError::InvalidTime(
                "end_time must be after start_time".to_string(),
            ));
        }

        debug!(
            "Creating appointment for patient {} with doctor {} at {}",
            request.patient_id, request.primary_doctor_id, request.start_time
        );

        let now = fmt_ts(Utc::now().naive_utc());
        let status = request.status.unwrap_or(AppointmentStatus::Scheduled);
        let appointment_data = json!({
            "clinic_id": request.clinic_id,
            "patient_id": request.patient_id,
            "primary_doctor_id": request.primary_doctor_id,
            "resource_id": request.resource_id,
            "start_time": fmt_ts(request.start_time),
            "end_time": fmt_ts(request.end_time),
            "status": status,
            "notes": request.notes,
            "created_by_user_id": created_by_user_id,
            "created_at": now,
            "updated_at": now,
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let created = result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no row".to_string()))?;

        serde_json::from_value(created)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    pub async fn get(&self, appointment_id: i64, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = TableQuery::new("appointments")
            .eq("id", appointment_id)
            .active()
            .path();

        let mut appointments = self.fetch(&path, auth_token).await?;
        if appointments.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(appointments.remove(0))
    }

    pub async fn search(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut table_query = TableQuery::new("appointments");

        if let Some(clinic_id) = query.clinic_id {
            table_query = table_query.eq("clinic_id", clinic_id);
        }
        if let Some(patient_id) = query.patient_id {
            table_query = table_query.eq("patient_id", patient_id);
        }
        if let Some(doctor_id) = query.doctor_id {
            table_query = table_query.eq("primary_doctor_id", doctor_id);
        }
        if let Some(status) = query.status {
            table_query = table_query.eq("status", status);
        }
        if let Some(from_date) = query.from_date {
            table_query = table_query.gte("start_time", fmt_ts(from_date));
        }
        if let Some(to_date) = query.to_date {
            table_query = table_query.lte("start_time", fmt_ts(to_date));
        }

        let path = table_query
            .active()
            .order("start_time.asc")
            .limit(query.limit.unwrap_or(100))
            .offset(query.offset.unwrap_or(0))
            .path();

        self.fetch(&path, auth_token).await
    }

    pub async fn update(
        &self,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
        updated_by_user_id: Option<i64>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        // 404 before patch; PostgREST happily patches zero rows
        self.get(appointment_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(doctor_id) = request.primary_doctor_id {
            update_data.insert("primary_doctor_id".to_string(), json!(doctor_id));
        }
        if let Some(resource_id) = request.resource_id {
            update_data.insert("resource_id".to_string(), json!(resource_id));
        }
        if let Some(start_time) = request.start_time {
            update_data.insert("start_time".to_string(), json!(fmt_ts(start_time)));
        }
        if let Some(end_time) = request.end_time {
            update_data.insert("end_time".to_string(), json!(fmt_ts(end_time)));
        }
        if let Some(status) = request.status {
            update_data.insert("status".to_string(), json!(status));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        update_data.insert("updated_by_user_id".to_string(), json!(updated_by_user_id));
        update_data.insert("updated_at".to_string(), json!(fmt_ts(Utc::now().naive_utc())));

        self.patch(appointment_id, Value::Object(update_data), auth_token)
            .await
    }

    /// Cancellation keeps the row; the Cancelled status frees the slot.
    pub async fn cancel(
        &self,
        appointment_id: i64,
        cancellation_reason: Option<String>,
        updated_by_user_id: Option<i64>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment {}", appointment_id);

        self.get(appointment_id, auth_token).await?;

        let update_data = json!({
            "status": AppointmentStatus::Cancelled,
            "cancellation_reason": cancellation_reason,
            "updated_by_user_id": updated_by_user_id,
            "updated_at": fmt_ts(Utc::now().naive_utc()),
        });

        self.patch(appointment_id, update_data, auth_token).await
    }

    /// Soft delete: the row stays but becomes invisible to every query.
    pub async fn soft_delete(&self, appointment_id: i64, auth_token: &str) -> Result<(), AppointmentError> {
        debug!("Soft-deleting appointment {}", appointment_id);

        self.get(appointment_id, auth_token).await?;

        let update_data = json!({
            "deleted_at": fmt_ts(Utc::now().naive_utc()),
        });

        self.patch(appointment_id, update_data, auth_token).await?;
        Ok(())
    }

    async fn fetch(&self, path: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    async fn patch(
        &self,
        appointment_id: i64,
        update_data: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = TableQuery::new("appointments").eq("id", appointment_id).path();

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let updated = result
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)?;

        serde_json::from_value(updated)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }
}

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}

fn fmt_ts(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S").to_string()
}
