use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
}

impl TestUser {
    pub fn new(email: &str, role: &str, permissions: &[&str]) -> Self {
        Self {
            id: "101".to_string(),
            email: email.to_string(),
            role: role.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Receptionist role: full scheduling surface.
    pub fn receptionist(email: &str) -> Self {
        Self::new(
            email,
            "receptionist",
            &[
                "appointments.create",
                "appointments.read",
                "appointments.update",
                "appointments.cancel",
                "appointments.delete",
                "doctors.read",
                "patients.create",
                "patients.read",
                "patients.update",
                "patients.delete",
                "clinics.read",
                "resources.read",
            ],
        )
    }

    pub fn admin(email: &str) -> Self {
        Self::new(
            email,
            "admin",
            &[
                "appointments.create",
                "appointments.read",
                "appointments.update",
                "appointments.cancel",
                "appointments.delete",
                "doctors.read",
                "patients.create",
                "patients.read",
                "patients.update",
                "patients.delete",
                "clinics.create",
                "clinics.read",
                "clinics.update",
                "resources.create",
                "resources.read",
                "resources.update",
                "resources.delete",
            ],
        )
    }

    /// A caller with no capabilities at all, for 403 paths.
    pub fn unprivileged(email: &str) -> Self {
        Self::new(email, "guest", &[])
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            permissions: self.permissions.clone(),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "permissions": user.permissions,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows matching the clinic schema.
pub struct MockRows;

impl MockRows {
    pub fn appointment_row(
        id: i64,
        clinic_id: i64,
        doctor_id: i64,
        resource_id: Option<i64>,
        start_time: &str,
        end_time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "clinic_id": clinic_id,
            "patient_id": 1,
            "primary_doctor_id": doctor_id,
            "resource_id": resource_id,
            "start_time": start_time,
            "end_time": end_time,
            "status": status,
            "notes": null,
            "cancellation_reason": null,
            "created_by_user_id": null,
            "updated_by_user_id": null,
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:00",
            "deleted_at": null
        })
    }

    pub fn doctor_row(id: i64, clinic_id: i64, first_name: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "clinic_id": clinic_id,
            "first_name": first_name,
            "last_name": last_name,
            "email": format!("{}.{}@clinic.example", first_name.to_lowercase(), last_name.to_lowercase()),
            "is_active": true
        })
    }

    pub fn patient_row(id: i64, clinic_id: i64, email: &str) -> serde_json::Value {
        json!({
            "id": id,
            "clinic_id": clinic_id,
            "first_name": "Test",
            "last_name": "Patient",
            "email": email,
            "phone_number": null,
            "date_of_birth": "1990-01-01",
            "address": null,
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:00",
            "deleted_at": null
        })
    }

    pub fn clinic_row(id: i64, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "address": "1 Main Street",
            "phone_number": null,
            "email": null,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:00",
            "deleted_at": null
        })
    }

    pub fn resource_row(id: i64, clinic_id: i64, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "clinic_id": clinic_id,
            "name": name,
            "resource_type": "Room",
            "location": null,
            "is_schedulable": true,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:00",
            "deleted_at": null
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_permissions() {
        let user = TestUser::receptionist("desk@clinic.example").to_user();
        assert!(user.has_permission("appointments.read"));
        assert!(!user.has_permission("clinics.create"));

        let guest = TestUser::unprivileged("guest@clinic.example").to_user();
        assert!(!guest.has_permission("appointments.read"));
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::receptionist("desk@clinic.example");
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_token_round_trip_carries_permissions() {
        let test_user = TestUser::receptionist("desk@clinic.example");
        let secret = "round-trip-secret";
        let token = JwtTestUtils::create_test_token(&test_user, secret, Some(1));

        let user = crate::jwt::validate_token(&token, secret).expect("token should validate");
        assert!(user.has_permission("appointments.read"));
        assert_eq!(user.role.as_deref(), Some("receptionist"));
    }
}
