// src/handlers/subjects.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::{AppError, conflict_on_constraint},
    models::subject::{CreateSubjectRequest, Subject, UpdateSubjectRequest},
};

async fn fetch_subject(pool: &SqlitePool, id: i64) -> Result<Subject, AppError> {
    sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Subject not found".to_string()))
}

pub async fn list_subjects(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let subjects = sqlx::query_as::<_, Subject>("SELECT * FROM subjects ORDER BY code")
        .fetch_all(&pool)
        .await?;

    Ok(Json(subjects))
}

pub async fn get_subject(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_subject(&pool, id).await?))
}

/// Admin only.
pub async fn create_subject(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let subject = sqlx::query_as::<_, Subject>(
        "INSERT INTO subjects (code, name, created_at) VALUES (?, ?, ?) RETURNING *",
    )
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        conflict_on_constraint(e, format!("Subject code '{}' already exists", payload.code))
    })?;

    Ok((StatusCode::CREATED, Json(subject)))
}

/// Admin only.
pub async fn update_subject(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let existing = fetch_subject(&pool, id).await?;
    if payload.code.is_none() && payload.name.is_none() {
        return Ok(Json(existing));
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE subjects SET ");
    let mut separated = builder.separated(", ");

    if let Some(code) = &payload.code {
        separated.push("code = ");
        separated.push_bind_unseparated(code.trim().to_string());
    }

    if let Some(name) = &payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name.trim().to_string());
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder
        .build()
        .execute(&pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "Subject code already exists"))?;

    Ok(Json(fetch_subject(&pool, id).await?))
}

/// Admin only. Subjects referenced by exam events cannot be removed.
pub async fn delete_subject(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "Subject is still used by exam events"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
