// src/handlers/staff.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::{AppError, conflict_on_constraint},
    handlers::auth::fetch_user,
    models::user::{CreateStaffRequest, UpdateStaffRequest, User, validate_role},
    utils::{hash::hash_password, jwt::Claims},
};

/// Lists all staff accounts, newest first.
/// Admin only.
pub async fn list_staff(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(users))
}

/// Creates a staff account with the given role.
/// Admin only.
pub async fn create_staff(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password, full_name, email, role, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, TRUE, ?)
        RETURNING *
        "#,
    )
    .bind(&payload.username)
    .bind(hashed_password)
    .bind(&payload.full_name)
    .bind(&payload.email)
    .bind(&payload.role)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        conflict_on_constraint(
            e,
            format!("Username '{}' already exists", payload.username),
        )
    })?;

    tracing::info!("Created {} account {}", user.role, user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Updates a staff account. Admins cannot demote or deactivate themselves.
/// Admin only.
pub async fn update_staff(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(role) = &payload.role {
        validate_role(role).map_err(|_| AppError::BadRequest(format!("Invalid role '{role}'")))?;
    }

    let is_self = id == claims.user_id()?;
    if is_self && payload.is_active == Some(false) {
        return Err(AppError::BadRequest(
            "Cannot deactivate yourself".to_string(),
        ));
    }
    if is_self && payload.role.as_deref().is_some_and(|r| r != claims.role) {
        return Err(AppError::BadRequest(
            "Cannot change your own role".to_string(),
        ));
    }

    let existing = fetch_user(&pool, id).await?;

    if payload.full_name.is_none()
        && payload.email.is_none()
        && payload.role.is_none()
        && payload.password.is_none()
        && payload.is_active.is_none()
    {
        return Ok(Json(existing));
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");

    if let Some(full_name) = payload.full_name {
        separated.push("full_name = ");
        separated.push_bind_unseparated(full_name);
    }

    if let Some(email) = payload.email {
        separated.push("email = ");
        separated.push_bind_unseparated(email);
    }

    if let Some(role) = payload.role {
        separated.push("role = ");
        separated.push_bind_unseparated(role);
    }

    if let Some(password) = payload.password {
        separated.push("password = ");
        separated.push_bind_unseparated(hash_password(&password)?);
    }

    if let Some(is_active) = payload.is_active {
        separated.push("is_active = ");
        separated.push_bind_unseparated(is_active);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update user: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(fetch_user(&pool, id).await?))
}

/// Deletes a staff account by ID.
/// Admin only. Prevents deleting self; accounts that booked events must be deactivated instead.
pub async fn delete_staff(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            conflict_on_constraint(
                e,
                "This account still owns exam events; deactivate it instead",
            )
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("Deleted user #{}", id);
    Ok(StatusCode::NO_CONTENT)
}
