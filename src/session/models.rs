use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Role that bypasses every permission check.
pub const ADMIN_ROLE: &str = "Admin";

/// Access/refresh credential pair as kept by the store.
///
/// A missing access token with a refresh token present is a valid transient
/// state while a renewal is in flight.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: Option<String>,
    pub refresh_token: String,
}

fn default_active() -> bool {
    true
}

/// User profile as returned by the backend.
///
/// The login response carries a reduced profile (no uuid, no permission map);
/// the serde defaults absorb the difference until `/auth/me` refreshes it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub permissions: HashMap<String, bool>,
}

impl UserProfile {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

#[derive(Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> LoginRequest<'a> {
    #[must_use]
    pub fn new(email: &'a str, password: &'a SecretString) -> Self {
        Self {
            email,
            password: password.expose_secret(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserProfile,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_defaults_absorb_reduced_login_payload() {
        let profile: UserProfile = serde_json::from_value(json!({
            "id": 1,
            "name": "Administrador do Sistema",
            "email": "admin@pdifinance.com",
            "role": "Admin"
        }))
        .unwrap();

        assert!(profile.uuid.is_none());
        assert!(profile.active);
        assert!(profile.permissions.is_empty());
        assert!(profile.is_admin());
    }

    #[test]
    fn profile_full_payload_round_trips() {
        let uuid = Uuid::new_v4();
        let profile: UserProfile = serde_json::from_value(json!({
            "id": 7,
            "uuid": uuid,
            "name": "Gestor",
            "email": "gestor@pdifinance.com",
            "role": "Gestor",
            "active": false,
            "permissions": { "can_edit_expenses": true }
        }))
        .unwrap();

        assert_eq!(profile.uuid, Some(uuid));
        assert!(!profile.active);
        assert_eq!(profile.permissions.get("can_edit_expenses"), Some(&true));
        assert!(!profile.is_admin());

        let back = serde_json::to_value(&profile).unwrap();
        let again: UserProfile = serde_json::from_value(back).unwrap();
        assert_eq!(profile, again);
    }

    #[test]
    fn login_request_exposes_password_only_on_the_wire() {
        let password = SecretString::from("Admin@2025".to_string());
        let request = LoginRequest::new("admin@pdifinance.com", &password);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["email"], "admin@pdifinance.com");
        assert_eq!(value["password"], "Admin@2025");
    }
}
