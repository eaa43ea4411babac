// src/models/class.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::student::Student;

/// Represents the 'classes' table: a named group of students, e.g. "A10 [AMT]/1".
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub grade_level: Option<i64>,
    /// Staff member responsible for the class.
    pub homeroom_staff_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A class together with its roster.
#[derive(Debug, Serialize)]
pub struct ClassDetail {
    #[serde(flatten)]
    pub class: Class,
    pub students: Vec<Student>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(range(min = 1, max = 13))]
    pub grade_level: Option<i64>,
    pub homeroom_staff_id: Option<i64>,
}

/// Fields are optional. `homeroom_staff_id: null` unassigns the homeroom teacher.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClassRequest {
    #[serde(default, deserialize_with = "super::trimmed_opt")]
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[validate(range(min = 1, max = 13))]
    pub grade_level: Option<i64>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub homeroom_staff_id: Option<Option<i64>>,
}
