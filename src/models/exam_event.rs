// src/models/exam_event.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const TYPE_HOMEWORK: &str = "homework";
pub const TYPE_QUIZ: &str = "quiz";
pub const TYPE_EXAM: &str = "exam";

pub const STATUS_SCHEDULED: &str = "scheduled";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

/// Represents the 'exam_events' table: a homework, quiz or exam booked for a class.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamEvent {
    pub id: i64,
    pub title: String,
    /// 'homework', 'quiz' or 'exam'.
    pub event_type: String,
    pub event_date: NaiveDate,
    pub period: i64,
    pub class_id: i64,
    pub subject_id: i64,
    pub notes: Option<String>,
    /// User who booked the event; only they or an admin may change it.
    pub created_by: i64,
    /// 'scheduled', 'completed' or 'cancelled'.
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event joined with the names the master schedule displays.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub title: String,
    pub event_type: String,
    pub event_date: NaiveDate,
    pub period: i64,
    pub status: String,
    pub class_id: i64,
    pub class_name: String,
    pub subject_id: i64,
    pub subject_code: String,
    pub subject_name: String,
    pub created_by: i64,
    pub creator_name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleDay {
    pub date: NaiveDate,
    pub events: Vec<ScheduleEntry>,
}

pub fn validate_event_type(event_type: &str) -> Result<(), validator::ValidationError> {
    match event_type {
        TYPE_HOMEWORK | TYPE_QUIZ | TYPE_EXAM => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_event_type")),
    }
}

pub fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        STATUS_SCHEDULED | STATUS_COMPLETED | STATUS_CANCELLED => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_status")),
    }
}

/// DTO for booking an event. The period upper bound depends on configuration
/// and is checked by the handler.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(custom(function = validate_event_type))]
    pub event_type: String,
    pub event_date: NaiveDate,
    #[validate(range(min = 1))]
    pub period: i64,
    pub class_id: i64,
    pub subject_id: i64,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// DTO for editing an event. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[serde(default, deserialize_with = "super::trimmed_opt")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub event_type: Option<String>,
    pub event_date: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub period: Option<i64>,
    pub class_id: Option<i64>,
    pub subject_id: Option<i64>,
    /// `null` clears the notes. Length is checked by the handler.
    #[serde(default, deserialize_with = "super::nullable")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(custom(function = validate_status))]
    pub status: String,
}

/// Filters for the event list.
#[derive(Debug, Deserialize)]
pub struct EventListParams {
    pub class_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub event_type: Option<String>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Only events booked by the caller.
    #[serde(default)]
    pub mine: bool,
}

/// Filters for the master schedule.
#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub class_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub event_type: Option<String>,
    #[serde(default)]
    pub include_cancelled: bool,
}
