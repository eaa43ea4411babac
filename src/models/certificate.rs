// src/models/certificate.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'certificate_templates' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CertificateTemplate {
    pub id: i64,
    pub name: String,
    /// Sanitized markup with `{{token}}` placeholders.
    pub html: String,
    pub css: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'certificates' table. The rendered document is excluded from listings;
/// it is served by its own endpoint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Certificate {
    pub id: i64,
    /// Public identifier printed on the document and used for verification.
    pub serial: String,
    pub template_id: i64,
    pub student_id: i64,
    pub title: String,
    #[serde(skip)]
    pub rendered_html: String,
    pub issued_by: Option<i64>,
    pub issued_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<i64>,
    pub revoke_reason: Option<String>,
}

/// Public answer to "is this certificate genuine?".
#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub serial: String,
    pub valid: bool,
    pub student_name: String,
    pub title: String,
    pub issued_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoke_reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 200000))]
    pub html: String,
    #[serde(default)]
    #[validate(length(max = 100000))]
    pub css: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTemplateRequest {
    #[serde(default, deserialize_with = "super::trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200000))]
    pub html: Option<String>,
    #[validate(length(max = 100000))]
    pub css: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IssueCertificateRequest {
    pub template_id: i64,
    pub student_id: i64,
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IssueClassRequest {
    pub template_id: i64,
    pub class_id: i64,
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RevokeRequest {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct CertificateListParams {
    pub student_id: Option<i64>,
    #[serde(default)]
    pub include_revoked: bool,
}
