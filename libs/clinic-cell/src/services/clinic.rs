use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::query::TableQuery;
use shared_database::supabase::SupabaseClient;

use crate::models::{Clinic, ClinicError, CreateClinicRequest, UpdateClinicRequest};

pub struct ClinicService {
    supabase: SupabaseClient,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_clinic(
        &self,
        request: CreateClinicRequest,
        auth_token: &str,
    ) -> Result<Clinic, ClinicError> {
        debug!("Creating clinic {}", request.name);

        let now = fmt_now();
        let clinic_data = json!({
            "name": request.name,
            "address": request.address,
            "phone_number": request.phone_number,
            "email": request.email,
            "timezone": request.timezone.unwrap_or_else(|| "UTC".to_string()),
            "is_active": true,
            "created_at": now,
            "updated_at": now,
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/clinics",
                Some(auth_token),
                Some(clinic_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let created = result
            .into_iter()
            .next()
            .ok_or_else(|| ClinicError::DatabaseError("Insert returned no row".to_string()))?;

        serde_json::from_value(created)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse clinic: {}", e)))
    }

    pub async fn get_clinic(&self, clinic_id: i64, auth_token: &str) -> Result<Clinic, ClinicError> {
        let path = TableQuery::new("clinics").eq("id", clinic_id).active().path();

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let clinic = result.into_iter().next().ok_or(ClinicError::ClinicNotFound)?;

        serde_json::from_value(clinic)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse clinic: {}", e)))
    }

    pub async fn list_clinics(&self, auth_token: &str) -> Result<Vec<Clinic>, ClinicError> {
        let path = TableQuery::new("clinics").active().order("name.asc").path();

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Clinic>, _>>()
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse clinics: {}", e)))
    }

    pub async fn update_clinic(
        &self,
        clinic_id: i64,
        request: UpdateClinicRequest,
        auth_token: &str,
    ) -> Result<Clinic, ClinicError> {
        debug!("Updating clinic {}", clinic_id);

        self.get_clinic(clinic_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(timezone) = request.timezone {
            update_data.insert("timezone".to_string(), json!(timezone));
        }
        if let Some(is_active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(is_active));
        }
        update_data.insert("updated_at".to_string(), json!(fmt_now()));

        let path = TableQuery::new("clinics").eq("id", clinic_id).path();

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let updated = result.into_iter().next().ok_or(ClinicError::ClinicNotFound)?;

        serde_json::from_value(updated)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse clinic: {}", e)))
    }
}

pub(crate) fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}

pub(crate) fn fmt_now() -> String {
    Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()
}
