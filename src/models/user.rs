// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

/// Represents the 'users' table: every portal login is a staff account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique login name.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub full_name: String,

    pub email: Option<String>,

    /// 'admin' or 'staff'.
    pub role: String,

    /// Deactivated accounts cannot log in or use an existing token.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Profile of the logged-in user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    /// Non-cancelled events this user booked for today or later.
    pub upcoming_events: i64,
}

/// Account flagged by the grace-period check.
#[derive(Debug, Serialize)]
pub struct InactiveAccount {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub days_since_creation: i64,
}

pub fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    if role != ROLE_ADMIN && role != ROLE_STAFF {
        return Err(validator::ValidationError::new("invalid_role"));
    }
    Ok(())
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 128))]
    pub current_password: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub new_password: String,
}

/// DTO for an admin creating a staff account.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStaffRequest {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom(function = validate_role))]
    pub role: String,
}

/// DTO for updating a staff account. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStaffRequest {
    #[serde(default, deserialize_with = "super::trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
    #[validate(length(min = 4, max = 128))]
    pub password: Option<String>,
    pub is_active: Option<bool>,
}
