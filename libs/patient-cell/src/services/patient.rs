use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::query::TableQuery;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!(
            "Creating patient record for {} {} at clinic {}",
            request.first_name, request.last_name, request.clinic_id
        );

        if let Some(email) = &request.email {
            let existing_path = TableQuery::new("patients")
                .eq("clinic_id", request.clinic_id)
                .eq("email", email)
                .active()
                .path();
            let existing: Vec<Value> = self
                .supabase
                .request(Method::GET, &existing_path, Some(auth_token), None)
                .await
                .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

            if !existing.is_empty() {
                return Err(PatientError::DuplicateEmail(email.clone()));
            }
        }

        let now = Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string();
        let patient_data = json!({
            "clinic_id": request.clinic_id,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "phone_number": request.phone_number,
            "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
            "address": request.address,
            "emergency_contact_name": request.emergency_contact_name,
            "emergency_contact_phone": request.emergency_contact_phone,
            "insurance_provider": request.insurance_provider,
            "insurance_policy_number": request.insurance_policy_number,
            "created_at": now,
            "updated_at": now,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(patient_data),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let created = result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Insert returned no row".to_string()))?;

        serde_json::from_value(created)
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    pub async fn get_patient(&self, patient_id: i64, auth_token: &str) -> Result<Patient, PatientError> {
        let path = TableQuery::new("patients").eq("id", patient_id).active().path();

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let patient = result.into_iter().next().ok_or(PatientError::NotFound)?;

        serde_json::from_value(patient)
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    pub async fn list_clinic_patients(
        &self,
        clinic_id: i64,
        limit: i64,
        offset: i64,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        let path = TableQuery::new("patients")
            .eq("clinic_id", clinic_id)
            .active()
            .order("last_name.asc")
            .limit(limit)
            .offset(offset)
            .path();

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Patient>, _>>()
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patients: {}", e)))
    }

    pub async fn update_patient(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient record {}", patient_id);

        self.get_patient(patient_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(name) = request.emergency_contact_name {
            update_data.insert("emergency_contact_name".to_string(), json!(name));
        }
        if let Some(phone) = request.emergency_contact_phone {
            update_data.insert("emergency_contact_phone".to_string(), json!(phone));
        }
        if let Some(provider) = request.insurance_provider {
            update_data.insert("insurance_provider".to_string(), json!(provider));
        }
        if let Some(policy) = request.insurance_policy_number {
            update_data.insert("insurance_policy_number".to_string(), json!(policy));
        }
        update_data.insert(
            "updated_at".to_string(),
            json!(Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()),
        );

        let path = TableQuery::new("patients").eq("id", patient_id).path();

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(headers),
            )
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let updated = result.into_iter().next().ok_or(PatientError::NotFound)?;

        serde_json::from_value(updated)
            .map_err(|e| PatientError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }

    pub async fn soft_delete_patient(&self, patient_id: i64, auth_token: &str) -> Result<(), PatientError> {
        debug!("Soft-deleting patient record {}", patient_id);

        self.get_patient(patient_id, auth_token).await?;

        let path = TableQuery::new("patients").eq("id", patient_id).path();
        let update_data = json!({
            "deleted_at": Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string(),
        });

        let _: Vec<Value> = self
            .supabase
            .request(Method::PATCH, &path, Some(auth_token), Some(update_data))
            .await
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
