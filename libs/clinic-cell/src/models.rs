use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

/// A bookable room or piece of equipment. Appointments reference resources
/// through their `resource_id` scoping column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicResource {
    pub id: i64,
    pub clinic_id: i64,
    pub name: String,
    pub resource_type: ResourceType,
    pub location: Option<String>,
    pub is_schedulable: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResourceType {
    Room,
    Equipment,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Room => write!(f, "Room"),
            ResourceType::Equipment => write!(f, "Equipment"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClinicRequest {
    pub name: String,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateClinicRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResourceRequest {
    pub clinic_id: i64,
    pub name: String,
    pub resource_type: ResourceType,
    pub location: Option<String>,
    pub is_schedulable: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResourceRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub is_schedulable: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClinicError {
    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Resource not found")]
    ResourceNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
