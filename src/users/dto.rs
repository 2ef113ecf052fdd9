use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Request body for user registration. Fields are optional so a missing
/// field is reported as a validation error rather than a parse failure.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration input that passed validation.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, ApiError> {
        let username = self.username.map(|u| u.trim().to_string()).unwrap_or_default();
        let email = self.email.as_deref().map(normalize_email).unwrap_or_default();
        let password = self.password.unwrap_or_default();

        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ApiError::validation("All fields are required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        if !is_valid_email(&email) {
            return Err(ApiError::validation("Invalid email"));
        }
        Ok(Registration {
            username,
            email,
            password,
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns the normalized email and the password.
    pub fn validate(self) -> Result<(String, String), ApiError> {
        let email = self.email.as_deref().map(normalize_email).unwrap_or_default();
        let password = self.password.unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::validation("Email and password are required"));
        }
        Ok((email, password))
    }
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub token: String,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}
