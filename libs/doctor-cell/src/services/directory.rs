use anyhow::{anyhow, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::query::TableQuery;
use shared_database::supabase::SupabaseClient;

use crate::models::DoctorProfile;

pub struct DoctorDirectoryService {
    supabase: SupabaseClient,
}

impl DoctorDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// All active doctors associated with a clinic.
    pub async fn list_clinic_doctors(
        &self,
        clinic_id: i64,
        auth_token: &str,
    ) -> Result<Vec<DoctorProfile>> {
        debug!("Listing doctors for clinic {}", clinic_id);

        let path = TableQuery::new("doctors")
            .eq("clinic_id", clinic_id)
            .is_true("is_active")
            .active()
            .order("last_name.asc")
            .path();

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let doctors = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DoctorProfile>, _>>()
            .map_err(|e| anyhow!("Failed to parse doctors: {}", e))?;

        Ok(doctors)
    }

    pub async fn get_doctor(&self, doctor_id: i64, auth_token: &str) -> Result<DoctorProfile> {
        debug!("Fetching doctor {}", doctor_id);

        let path = TableQuery::new("doctors")
            .eq("id", doctor_id)
            .active()
            .path();

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Doctor not found"))?;

        serde_json::from_value(doctor).map_err(|e| anyhow!("Failed to parse doctor: {}", e))
    }
}
