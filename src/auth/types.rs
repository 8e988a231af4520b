use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::token::Claims;
use crate::db::models::User;
use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Identifiers are compared case-insensitively; normalize once at the edge.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The user as seen over the wire and cached client-side. Never carries the
/// password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_credentials(&self.email, &self.password)?;
        if self.full_name.trim().is_empty() {
            return Err(AppError::ValidationError("fullName is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl SignInRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_credentials(&self.email, &self.password)
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::ValidationError("email is required".into()));
    }
    if !email.contains('@') {
        return Err(AppError::ValidationError("email is not valid".into()));
    }
    if password.is_empty() {
        return Err(AppError::ValidationError("password is required".into()));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MePayload {
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStatus {
    pub valid: bool,
    pub claims: Claims,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str, password: &str, full_name: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        }
    }

    #[test]
    fn test_signup_validation() {
        assert!(signup("a@x.com", "secret1", "A").validate().is_ok());
        assert!(signup("", "secret1", "A").validate().is_err());
        assert!(signup("not-an-email", "secret1", "A").validate().is_err());
        assert!(signup("a@x.com", "short", "A").validate().is_err());
        assert!(signup("a@x.com", "", "A").validate().is_err());
        assert!(signup("a@x.com", "secret1", "  ").validate().is_err());
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }

    #[test]
    fn test_public_user_wire_shape() {
        let user = User::new(
            "a@x.com".to_string(),
            "A".to_string(),
            "hash".to_string(),
        );
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();

        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["fullName"], "A");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
