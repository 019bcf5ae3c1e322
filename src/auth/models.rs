//! Authentication Models
//! Mission: Define user identity and authentication data structures

use crate::validation::{self, FieldErrors};
use serde::{Deserialize, Serialize};

pub type UserId = i64;

pub const MIN_PASSWORD_LEN: usize = 8;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub created_at: String,
}

/// The authenticated caller, resolved once per request by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (user_id)
    pub email: String,
    pub exp: usize, // expiration timestamp
}

/// Registration request body. Fields are optional so that missing ones are
/// reported per field instead of as a body parse failure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A registration that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = validation::required_text(&mut errors, "name", self.name, 100);

        let email = validation::required_text(&mut errors, "email", self.email, 254);
        let email = validation::normalize_email(&email);
        if errors.get("email").is_none() && !validation::is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        // Passwords are taken verbatim, whitespace included.
        let password = match self.password {
            None => {
                errors.add("password", validation::REQUIRED);
                String::new()
            }
            Some(p) if p.is_empty() => {
                errors.add("password", validation::BLANK);
                p
            }
            Some(p) if p.chars().count() < MIN_PASSWORD_LEN => {
                errors.add(
                    "password",
                    format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
                );
                p
            }
            Some(p) => p,
        };

        errors.finish(NewUser {
            name,
            email,
            password,
        })
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: usize, // seconds until expiration
    pub user: UserResponse,
}

/// User response (sanitized)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }

    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            id: identity.user_id,
            name: identity.name.clone(),
            email: identity.email.clone(),
        }
    }
}

/// Registration response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn test_valid_registration() {
        let new_user = request("Alice", "alice@X.com", "password123")
            .validate()
            .unwrap();
        assert_eq!(new_user.name, "Alice");
        assert_eq!(new_user.email, "alice@x.com");
        assert_eq!(new_user.password, "password123");
    }

    #[test]
    fn test_missing_fields_reported_individually() {
        let errors = RegisterRequest::default().validate().unwrap_err();
        for field in ["name", "email", "password"] {
            assert_eq!(
                errors.get(field).unwrap(),
                [validation::REQUIRED.to_string()],
                "{field}"
            );
        }
    }

    #[test]
    fn test_malformed_email_and_short_password() {
        let errors = request("Alice", "not-an-email", "short").validate().unwrap_err();
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
        assert!(errors.get("name").is_none());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: 1,
            name: "Alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("$2b$"));
    }

    #[test]
    fn test_user_response_from_identity() {
        let identity = Identity {
            user_id: 7,
            name: "Bob".to_string(),
            email: "bob@x.com".to_string(),
        };
        let response = UserResponse::from_identity(&identity);
        assert_eq!(response.id, 7);
        assert_eq!(response.email, "bob@x.com");
    }
}
