// src/handlers/classes.rs

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
    handlers::ensure_exists,
    models::{
        class::{Class, ClassDetail, CreateClassRequest, UpdateClassRequest},
        student::Student,
    },
};

async fn fetch_class(pool: &SqlitePool, id: i64) -> Result<Class, AppError> {
    sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Class not found".to_string()))
}

/// Lists all classes ordered by name.
pub async fn list_classes(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let classes = sqlx::query_as::<_, Class>("SELECT * FROM classes ORDER BY name")
        .fetch_all(&pool)
        .await?;

    Ok(Json(classes))
}

/// Retrieves a class with its students.
pub async fn get_class(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let class = fetch_class(&pool, id).await?;

    let students = sqlx::query_as::<_, Student>(
        "SELECT * FROM students WHERE class_id = ? ORDER BY full_name",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ClassDetail { class, students }))
}

/// Creates a class.
/// Admin only.
pub async fn create_class(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(staff_id) = payload.homeroom_staff_id {
        ensure_exists(&pool, "users", staff_id, "Staff member").await?;
    }

    let class = sqlx::query_as::<_, Class>(
        r#"
        INSERT INTO classes (name, grade_level, homeroom_staff_id, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.grade_level)
    .bind(payload.homeroom_staff_id)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| conflict_on_constraint(e, format!("Class '{}' already exists", payload.name)))?;

    Ok((StatusCode::CREATED, Json(class)))
}

/// Updates a class by ID.
/// Admin only.
pub async fn update_class(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let existing = fetch_class(&pool, id).await?;

    if payload.name.is_none() && payload.grade_level.is_none() && payload.homeroom_staff_id.is_none()
    {
        return Ok(Json(existing));
    }

    if let Some(Some(staff_id)) = payload.homeroom_staff_id {
        ensure_exists(&pool, "users", staff_id, "Staff member").await?;
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE classes SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = &payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name.trim().to_string());
    }

    if let Some(grade_level) = payload.grade_level {
        separated.push("grade_level = ");
        separated.push_bind_unseparated(grade_level);
    }

    if let Some(staff_id) = payload.homeroom_staff_id {
        separated.push("homeroom_staff_id = ");
        separated.push_bind_unseparated(staff_id);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        conflict_on_constraint(
            e,
            format!(
                "Class '{}' already exists",
                payload.name.as_deref().unwrap_or_default()
            ),
        )
    })?;

    Ok(Json(fetch_class(&pool, id).await?))
}

/// Deletes a class. Its students become unassigned; classes with booked events are kept.
/// Admin only.
pub async fn delete_class(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM classes WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "Class still has exam events"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Class not found".to_string()));
    }

    tracing::info!("Deleted class #{}", id);
    Ok(StatusCode::NO_CONTENT)
}
