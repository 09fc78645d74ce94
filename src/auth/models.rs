//! Authentication Models
//! Mission: Define user, claim and request/response data structures

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String, // bcrypt hash - never serialize
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

/// JWT Claims payload
///
/// `iat` is the original issuance time and is preserved across refreshes,
/// anchoring the refresh horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token response, returned by login and refresh
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub expire: String, // RFC3339
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

/// Create user request (admin only)
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

/// Password change request (admin only)
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "oldPassword")]
    pub old_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Role toggle request (admin only)
#[derive(Debug, Deserialize)]
pub struct ToggleAdminRequest {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

/// The fixed `{success, message}` body every status response uses.
pub fn status_message(success: bool, message: &str) -> Value {
    json!({ "success": success, "message": message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_never_serializes_password_hash() {
        let user = User {
            user_id: 1,
            username: "testuser".to_string(),
            password_hash: "hash123".to_string(),
            is_admin: false,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userId"], 1);
        assert_eq!(json["username"], "testuser");
        assert_eq!(json["isAdmin"], false);
        assert!(json.get("password_hash").is_none());
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_claims_wire_names() {
        let claims = Claims {
            sub: 7,
            is_admin: true,
            iat: 100,
            exp: 200,
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], 7);
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["exp"], 200);

        let back: Claims = serde_json::from_value(json).unwrap();
        assert_eq!(back, claims);
    }

    #[test]
    fn test_claims_reject_wrong_types() {
        // An untyped payload with a string subject must not decode.
        let raw = json!({ "sub": "7", "isAdmin": true, "iat": 100, "exp": 200 });
        assert!(serde_json::from_value::<Claims>(raw).is_err());

        let missing_role = json!({ "sub": 7, "iat": 100, "exp": 200 });
        assert!(serde_json::from_value::<Claims>(missing_role).is_err());
    }

    #[test]
    fn test_status_message_shape() {
        let body = status_message(false, "Login failed!");
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Login failed!");
    }
}
