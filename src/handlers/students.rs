// src/handlers/students.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::{AppError, conflict_on_constraint},
    handlers::ensure_exists,
    models::student::{CreateStudentRequest, Student, StudentListParams, UpdateStudentRequest},
};

pub(crate) async fn fetch_student(pool: &SqlitePool, id: i64) -> Result<Student, AppError> {
    sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))
}

/// Lists students, optionally filtered by class and a name search.
pub async fn list_students(
    State(pool): State<SqlitePool>,
    Query(params): Query<StudentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM students WHERE 1 = 1");

    if let Some(class_id) = params.class_id {
        builder.push(" AND class_id = ");
        builder.push_bind(class_id);
    }

    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        builder.push(" AND full_name LIKE ");
        builder.push_bind(format!("%{}%", q));
    }

    builder.push(" ORDER BY full_name");

    let students: Vec<Student> = builder.build_query_as().fetch_all(&pool).await?;
    Ok(Json(students))
}

pub async fn get_student(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_student(&pool, id).await?))
}

/// Admin only.
pub async fn create_student(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(class_id) = payload.class_id {
        ensure_exists(&pool, "classes", class_id, "Class").await?;
    }

    let student = sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (student_number, full_name, class_id, email, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(payload.student_number.trim())
    .bind(payload.full_name.trim())
    .bind(payload.class_id)
    .bind(&payload.email)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        conflict_on_constraint(
            e,
            format!("Student number '{}' already exists", payload.student_number),
        )
    })?;

    Ok((StatusCode::CREATED, Json(student)))
}

/// Admin only.
pub async fn update_student(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let existing = fetch_student(&pool, id).await?;
    if payload.student_number.is_none()
        && payload.full_name.is_none()
        && payload.class_id.is_none()
        && payload.email.is_none()
    {
        return Ok(Json(existing));
    }

    if let Some(Some(class_id)) = payload.class_id {
        ensure_exists(&pool, "classes", class_id, "Class").await?;
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE students SET ");
    let mut separated = builder.separated(", ");

    if let Some(number) = &payload.student_number {
        separated.push("student_number = ");
        separated.push_bind_unseparated(number.trim().to_string());
    }

    if let Some(full_name) = &payload.full_name {
        separated.push("full_name = ");
        separated.push_bind_unseparated(full_name.trim().to_string());
    }

    if let Some(class_id) = payload.class_id {
        separated.push("class_id = ");
        separated.push_bind_unseparated(class_id);
    }

    if let Some(email) = &payload.email {
        separated.push("email = ");
        separated.push_bind_unseparated(email.clone());
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder
        .build()
        .execute(&pool)
        .await
        .map_err(|e| conflict_on_constraint(e, "Student number already exists"))?;

    Ok(Json(fetch_student(&pool, id).await?))
}

/// Admin only. Removes the student's certificates with them.
pub async fn delete_student(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
