use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::{add_error, collect};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecoveryToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            username: u.username,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    /// Password (minimum 6 characters)
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(
        min = 6,
        message = "Password confirmation must be at least 6 characters"
    ))]
    pub confirm_password: String,
}

impl RegisterRequest {
    /// Trim text fields the way they will be stored.
    pub fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            confirm_password: self.confirm_password,
        }
    }

    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = collect(self.validate());
        if self.password != self.confirm_password {
            add_error(
                &mut errors,
                "confirm_password",
                "mismatch",
                "Passwords do not match",
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address or username
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub email_or_username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecoverPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(
        min = 6,
        message = "Password confirmation must be at least 6 characters"
    ))]
    pub confirm_password: String,
}

impl RecoverPasswordRequest {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = collect(self.validate());
        if self.password != self.confirm_password {
            add_error(
                &mut errors,
                "confirm_password",
                "mismatch",
                "Passwords do not match",
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            username: "ana".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn test_register_accepts_matching_passwords() {
        assert!(register("secret1", "secret1").check().is_ok());
    }

    #[test]
    fn test_register_rejects_mismatch_on_confirmation_field() {
        let errors = register("secret1", "secret2").check().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("confirm_password"));
        assert!(!fields.contains_key("password"));
    }

    #[test]
    fn test_register_rejects_bad_email_and_short_password() {
        let mut req = register("123", "123");
        req.email = "not-an-email".into();
        let errors = req.check().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_normalized_trims_identity_fields() {
        let mut req = register("secret1", "secret1");
        req.username = "  ana ".into();
        req.email = " ana@example.com ".into();
        let req = req.normalized();
        assert_eq!(req.username, "ana");
        assert_eq!(req.email, "ana@example.com");
    }
}
