// src/handlers/certificates.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, conflict_on_constraint},
    handlers::{auth::fetch_user, ensure_exists},
    models::{
        certificate::{
            Certificate, CertificateListParams, CertificateTemplate, CreateTemplateRequest,
            IssueCertificateRequest, IssueClassRequest, RevokeRequest, UpdateTemplateRequest,
            VerificationResponse,
        },
        student::Student,
        user::User,
    },
    utils::{
        html::clean_template_html,
        jwt::Claims,
        template::{render_document, sample_values, unknown_placeholders},
    },
};

async fn fetch_template(pool: &SqlitePool, id: i64) -> Result<CertificateTemplate, AppError> {
    sqlx::query_as::<_, CertificateTemplate>("SELECT * FROM certificate_templates WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Certificate template not found".to_string()))
}

async fn fetch_certificate(pool: &SqlitePool, id: i64) -> Result<Certificate, AppError> {
    sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Certificate not found".to_string()))
}

/// Sanitizes template markup and rejects placeholders the renderer cannot fill.
/// The check runs on the sanitized output, which is what gets stored and rendered.
fn prepare_template_html(html: &str) -> Result<String, AppError> {
    let cleaned = clean_template_html(html);
    let unknown = unknown_placeholders(&cleaned);
    if !unknown.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Unknown placeholder(s): {}",
            unknown.join(", ")
        )));
    }
    Ok(cleaned)
}

fn verify_url(config: &Config, serial: &str) -> String {
    config
        .public_base_url
        .join(&format!("/api/certificates/verify/{serial}"))
        .map(|u| u.to_string())
        .unwrap_or_default()
}

/// Renders and stores one certificate on the given connection.
async fn issue_one(
    conn: &mut SqliteConnection,
    config: &Config,
    template: &CertificateTemplate,
    student: &Student,
    class_name: Option<&str>,
    title: &str,
    issuer: &User,
) -> Result<Certificate, AppError> {
    let serial = uuid::Uuid::new_v4().to_string();
    let issued_at = Utc::now();

    let values = HashMap::from([
        ("student_name", student.full_name.clone()),
        ("student_number", student.student_number.clone()),
        ("class_name", class_name.unwrap_or_default().to_string()),
        ("title", title.to_string()),
        ("issue_date", issued_at.date_naive().to_string()),
        ("serial", serial.clone()),
        ("issuer_name", issuer.full_name.clone()),
        ("verify_url", verify_url(config, &serial)),
    ]);
    let rendered = render_document(title, &template.html, &template.css, &values);

    let certificate = sqlx::query_as::<_, Certificate>(
        r#"
        INSERT INTO certificates (serial, template_id, student_id, title, rendered_html, issued_by, issued_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&serial)
    .bind(template.id)
    .bind(student.id)
    .bind(title)
    .bind(rendered)
    .bind(issuer.id)
    .bind(issued_at)
    .fetch_one(conn)
    .await?;

    Ok(certificate)
}

async fn class_name_of(pool: &SqlitePool, class_id: Option<i64>) -> Result<Option<String>, AppError> {
    let Some(class_id) = class_id else {
        return Ok(None);
    };
    let name = sqlx::query_scalar("SELECT name FROM classes WHERE id = ?")
        .bind(class_id)
        .fetch_optional(pool)
        .await?;
    Ok(name)
}

pub async fn list_templates(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let templates =
        sqlx::query_as::<_, CertificateTemplate>("SELECT * FROM certificate_templates ORDER BY name")
            .fetch_all(&pool)
            .await?;
    Ok(Json(templates))
}

pub async fn get_template(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_template(&pool, id).await?))
}

/// Renders a template with sample values so it can be checked before issuing.
pub async fn preview_template(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let template = fetch_template(&pool, id).await?;
    Ok(Html(render_document(
        &template.name,
        &template.html,
        &template.css,
        &sample_values(),
    )))
}

/// Admin only.
pub async fn create_template(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let html = prepare_template_html(&payload.html)?;
    let now = Utc::now();

    let template = sqlx::query_as::<_, CertificateTemplate>(
        r#"
        INSERT INTO certificate_templates (name, html, css, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(html)
    .bind(&payload.css)
    .bind(claims.user_id()?)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| conflict_on_constraint(e, format!("Template '{}' already exists", payload.name)))?;

    Ok((StatusCode::CREATED, Json(template)))
}

/// Admin only. Certificates already issued keep the document they were rendered with.
pub async fn update_template(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let existing = fetch_template(&pool, id).await?;
    if payload.name.is_none() && payload.html.is_none() && payload.css.is_none() {
        return Ok(Json(existing));
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE certificate_templates SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = &payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name.trim().to_string());
    }

    if let Some(html) = &payload.html {
        separated.push("html = ");
        separated.push_bind_unseparated(prepare_template_html(html)?);
    }

    if let Some(css) = payload.css {
        separated.push("css = ");
        separated.push_bind_unseparated(css);
    }

    separated.push("updated_at = ");
    separated.push_bind_unseparated(Utc::now());

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder
        .build()
        .execute(&pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "A template with that name already exists"))?;

    Ok(Json(fetch_template(&pool, id).await?))
}

/// Admin only. Templates that issued certificates are kept for the record.
pub async fn delete_template(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM certificate_templates WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "Template has issued certificates"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Certificate template not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Issues a certificate to one student.
pub async fn issue_certificate(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<IssueCertificateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let template = fetch_template(&pool, payload.template_id).await?;
    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
        .bind(payload.student_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::BadRequest(format!(
            "Student #{} does not exist",
            payload.student_id
        )))?;
    let class_name = class_name_of(&pool, student.class_id).await?;
    let issuer = fetch_user(&pool, claims.user_id()?).await?;

    let mut conn = pool.acquire().await?;
    let certificate = issue_one(
        &mut conn,
        &config,
        &template,
        &student,
        class_name.as_deref(),
        payload.title.trim(),
        &issuer,
    )
    .await?;

    tracing::info!(
        "Issued certificate {} to student #{}",
        certificate.serial,
        student.id
    );
    Ok((StatusCode::CREATED, Json(certificate)))
}

/// Issues the same certificate to every student currently in a class, atomically.
pub async fn issue_class_certificates(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<IssueClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let template = fetch_template(&pool, payload.template_id).await?;
    ensure_exists(&pool, "classes", payload.class_id, "Class").await?;
    let class_name = class_name_of(&pool, Some(payload.class_id)).await?;
    let issuer = fetch_user(&pool, claims.user_id()?).await?;

    let students = sqlx::query_as::<_, Student>(
        "SELECT * FROM students WHERE class_id = ? ORDER BY full_name",
    )
    .bind(payload.class_id)
    .fetch_all(&pool)
    .await?;

    let mut tx = pool.begin().await?;
    let mut issued = Vec::with_capacity(students.len());
    for student in &students {
        let certificate = issue_one(
            &mut tx,
            &config,
            &template,
            student,
            class_name.as_deref(),
            payload.title.trim(),
            &issuer,
        )
        .await?;
        issued.push(certificate);
    }
    tx.commit().await?;

    tracing::info!(
        "Issued {} certificate(s) to class #{}",
        issued.len(),
        payload.class_id
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "issued": issued.len(),
            "certificates": issued,
        })),
    ))
}

pub async fn list_certificates(
    State(pool): State<SqlitePool>,
    Query(params): Query<CertificateListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM certificates WHERE 1 = 1");

    if let Some(student_id) = params.student_id {
        builder.push(" AND student_id = ");
        builder.push_bind(student_id);
    }
    if !params.include_revoked {
        builder.push(" AND revoked_at IS NULL");
    }
    builder.push(" ORDER BY issued_at DESC, id DESC");

    let certificates: Vec<Certificate> = builder.build_query_as().fetch_all(&pool).await?;
    Ok(Json(certificates))
}

pub async fn get_certificate(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_certificate(&pool, id).await?))
}

/// The stored document, exactly as it was rendered at issue time.
pub async fn certificate_html(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let certificate = fetch_certificate(&pool, id).await?;
    Ok(Html(certificate.rendered_html))
}

/// Revokes a certificate. Only the issuer or an admin may do this, and only once.
pub async fn revoke_certificate(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<RevokeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let certificate = fetch_certificate(&pool, id).await?;
    let user_id = claims.user_id()?;

    if certificate.issued_by != Some(user_id) && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "Only the issuer or an admin can revoke this certificate".to_string(),
        ));
    }

    let result = sqlx::query(
        "UPDATE certificates SET revoked_at = ?, revoked_by = ?, revoke_reason = ?
         WHERE id = ? AND revoked_at IS NULL",
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(payload.reason.trim())
    .bind(id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "Certificate is already revoked".to_string(),
        ));
    }

    tracing::info!("Certificate {} revoked by user #{}", certificate.serial, user_id);
    Ok(Json(fetch_certificate(&pool, id).await?))
}

/// Public lookup by serial, used by the link printed on each certificate.
pub async fn verify_certificate(
    State(pool): State<SqlitePool>,
    Path(serial): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let certificate = sqlx::query_as::<_, Certificate>("SELECT * FROM certificates WHERE serial = ?")
        .bind(&serial)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("No certificate with that serial".to_string()))?;

    let student_name: String = sqlx::query_scalar("SELECT full_name FROM students WHERE id = ?")
        .bind(certificate.student_id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(VerificationResponse {
        serial: certificate.serial,
        valid: certificate.revoked_at.is_none(),
        student_name,
        title: certificate.title,
        issued_at: certificate.issued_at,
        revoked_at: certificate.revoked_at,
        revoke_reason: certificate.revoke_reason,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_placeholders_block_saving() {
        assert!(matches!(
            prepare_template_html("<p>{{student_name}} {{grade}}</p>"),
            Err(AppError::BadRequest(msg)) if msg.contains("grade")
        ));
    }

    #[test]
    fn saved_markup_is_sanitized() {
        let html = prepare_template_html("<h1>{{title}}</h1><script>x()</script>").unwrap();
        assert_eq!(html, "<h1>{{title}}</h1>");
    }

    #[test]
    fn tokens_assembled_by_sanitizing_are_checked() {
        assert!(matches!(
            prepare_template_html("<p>{<script></script>{favourite_colour}}</p>"),
            Err(AppError::BadRequest(msg)) if msg.contains("favourite_colour")
        ));
    }

    #[test]
    fn verify_url_is_absolute() {
        let config = Config::for_tests("s");
        assert_eq!(
            verify_url(&config, "abc"),
            "http://portal.test/api/certificates/verify/abc"
        );
    }
}
