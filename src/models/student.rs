// src/models/student.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'students' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub student_number: String,
    pub full_name: String,
    pub class_id: Option<i64>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct StudentListParams {
    pub class_id: Option<i64>,
    /// Substring match on the student's name.
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 30))]
    pub student_number: String,
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    pub class_id: Option<i64>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[serde(default, deserialize_with = "super::trimmed_opt")]
    #[validate(length(min = 1, max = 30))]
    pub student_number: Option<String>,
    #[serde(default, deserialize_with = "super::trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    /// `null` takes the student out of their class.
    #[serde(default, deserialize_with = "super::nullable")]
    pub class_id: Option<Option<i64>>,
    #[validate(email)]
    pub email: Option<String>,
}
