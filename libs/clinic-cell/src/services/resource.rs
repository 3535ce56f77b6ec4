use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::query::TableQuery;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClinicError, ClinicResource, CreateResourceRequest, UpdateResourceRequest};
use crate::services::clinic::{fmt_now, representation_headers};

pub struct ResourceService {
    supabase: SupabaseClient,
}

impl ResourceService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_resource(
        &self,
        request: CreateResourceRequest,
        auth_token: &str,
    ) -> Result<ClinicResource, ClinicError> {
        debug!(
            "Creating {} resource {} for clinic {}",
            request.resource_type, request.name, request.clinic_id
        );

        let now = fmt_now();
        let resource_data = json!({
            "clinic_id": request.clinic_id,
            "name": request.name,
            "resource_type": request.resource_type,
            "location": request.location,
            "is_schedulable": request.is_schedulable.unwrap_or(true),
            "is_active": true,
            "created_at": now,
            "updated_at": now,
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/resources",
                Some(auth_token),
                Some(resource_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let created = result
            .into_iter()
            .next()
            .ok_or_else(|| ClinicError::DatabaseError("Insert returned no row".to_string()))?;

        serde_json::from_value(created)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse resource: {}", e)))
    }

    pub async fn get_resource(
        &self,
        resource_id: i64,
        auth_token: &str,
    ) -> Result<ClinicResource, ClinicError> {
        let path = TableQuery::new("resources").eq("id", resource_id).active().path();

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        let resource = result.into_iter().next().ok_or(ClinicError::ResourceNotFound)?;

        serde_json::from_value(resource)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse resource: {}", e)))
    }

    pub async fn list_clinic_resources(
        &self,
        clinic_id: i64,
        auth_token: &str,
    ) -> Result<Vec<ClinicResource>, ClinicError> {
        let path = TableQuery::new("resources")
            .eq("clinic_id", clinic_id)
            .active()
            .order("name.asc")
            .path();

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ClinicResource>, _>>()
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse resources: {}", e)))
    }

    pub async fn update_resource(
        &self,
        resource_id: i64,
        request: UpdateResourceRequest,
        auth_token: &str,
    ) -> Result<ClinicResource, ClinicError> {
        debug!("Updating resource {}", resource_id);

        self.get_resource(resource_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();
        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(location) = request.location {
            update_data.insert("location".to_string(), json!(location));
        }
        if let Some(is_schedulable) = request.is_schedulable {
            update_data.insert("is_schedulable".to_string(), json!(is_schedulable));
        }
        if let Some(is_active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(is_active));
        }
        update_data.insert("updated_at".to_string(), json!(fmt_now()));

        let path = TableQuery::new("resources").eq("id", resource_id).path();

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

        let updated = result.into_iter().next().ok_or(ClinicError::ResourceNotFound)?;

        serde_json::from_value(updated)
            .map_err(|e| ClinicError::DatabaseError(format!("Failed to parse resource: {}", e)))
    }

    pub async fn soft_delete_resource(
        &self,
        resource_id: i64,
        auth_token: &str,
    ) -> Result<(), ClinicError> {
        debug!("Soft-deleting resource {}", resource_id);

        self.get_resource(resource_id, auth_token).await?;

        let path = TableQuery::new("resources").eq("id", resource_id).path();
        let update_data = json!({ "deleted_at": fmt_now() });

        let _: Vec<Value> = self
            .supabase
            .request(Method::PATCH, &path, Some(auth_token), Some(update_data))
            .await
            .map_err(|e| ClinicError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
