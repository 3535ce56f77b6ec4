use serde::{Deserialize, Serialize};

/// A doctor as exposed by the clinic directory, backed by the `doctors`
/// view over clinical staff accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: i64,
    pub clinic_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub is_active: bool,
}

impl DoctorProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
