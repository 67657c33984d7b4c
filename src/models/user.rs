use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Fields a `PATCH /users/me` body may contain.
pub const USER_PATCH_FIELDS: &[&str] = &["name", "email", "password", "age"];

/// The API-facing user record.
///
/// Deliberately excludes the password hash, the avatar bytes, and the session
/// tokens: those columns are never selected into this struct, so no response
/// serialization path can leak them.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload.
#[derive(Debug, Deserialize, Validate)]
pub struct UserInput {
    /// Display name. Must be non-empty once trimmed.
    #[validate(custom = "validate_name")]
    pub name: String,
    #[validate(email(message = "Use a valid emailID format!"))]
    pub email: String,
    /// Defaults to 0 when omitted.
    #[serde(default)]
    #[validate(range(min = 0, message = "Age must be positive!"))]
    pub age: i32,
    /// Raw password. Hashed before it ever reaches storage.
    #[validate(
        length(min = 6, message = "Password must be at least 6 characters"),
        custom = "validate_password"
    )]
    pub password: String,
}

/// Fields of a profile patch, after the allow-list key check has passed.
#[derive(Debug, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(custom = "validate_name")]
    pub name: Option<String>,
    #[validate(email(message = "Use a valid emailID format!"))]
    pub email: Option<String>,
    #[validate(
        length(min = 6, message = "Password must be at least 6 characters"),
        custom = "validate_password"
    )]
    pub password: Option<String>,
    #[validate(range(min = 0, message = "Age must be positive!"))]
    pub age: Option<i32>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none() && self.age.is_none()
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name");
        err.message = Some("Name must not be empty".into());
        return Err(err);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        let mut err = ValidationError::new("password");
        err.message = Some("'password' must not be a part of password".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn valid_input() -> UserInput {
        UserInput {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            age: 5,
            password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_user_input_validation() {
        assert!(valid_input().validate().is_ok());

        // Invalid email
        let mut input = valid_input();
        input.email = "invalid-email".to_string();
        assert!(input.validate().is_err());

        // Short password
        let mut input = valid_input();
        input.password = "short".to_string();
        assert!(input.validate().is_err());

        // Whitespace-only name
        let mut input = valid_input();
        input.name = "   ".to_string();
        assert!(input.validate().is_err());

        // Negative age
        let mut input = valid_input();
        input.age = -1;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_password_must_not_contain_the_word_password() {
        let mut input = valid_input();
        input.password = "myPassword1".to_string();
        assert!(input.validate().is_err());

        // Case-insensitive
        input.password = "PASSWORD99".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_age_defaults_to_zero() {
        let input: UserInput = serde_json::from_value(serde_json::json!({
            "name": "A",
            "email": "a@x.com",
            "password": "secret1"
        }))
        .unwrap();
        assert_eq!(input.age, 0);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_user_patch_validation() {
        let patch: UserPatch = serde_json::from_value(serde_json::json!({
            "age": 30
        }))
        .unwrap();
        assert!(patch.validate().is_ok());
        assert!(!patch.is_empty());

        let patch: UserPatch = serde_json::from_value(serde_json::json!({
            "email": "not-an-email"
        }))
        .unwrap();
        assert!(patch.validate().is_err());

        let patch: UserPatch = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(patch.is_empty());
    }
}
