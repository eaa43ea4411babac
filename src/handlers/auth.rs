// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        exam_event::STATUS_CANCELLED,
        user::{ChangePasswordRequest, LoginRequest, MeResponse, User},
    },
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

pub(crate) async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Authenticates a user and returns a JWT token.
///
/// Deactivated accounts get 403 even with the right password, so the UI can tell
/// the user to contact an administrator. A successful login stamps `last_login_at`.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    if !user.is_active {
        tracing::info!("Rejected login for deactivated account {}", user.username);
        return Err(AppError::Forbidden(
            "This account has been deactivated".to_string(),
        ));
    }

    sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user.id)
        .execute(&pool)
        .await?;

    let token = sign_jwt(
        user.id,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role,
        "expires_in": config.jwt_expiration
    })))
}

/// Get current user's profile and number of upcoming bookings.
pub async fn get_me(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user(&pool, claims.user_id()?).await?;

    let upcoming_events: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM exam_events
         WHERE created_by = ? AND status != ? AND event_date >= ?",
    )
    .bind(user.id)
    .bind(STATUS_CANCELLED)
    .bind(Utc::now().date_naive())
    .fetch_one(&pool)
    .await?;

    Ok(Json(MeResponse {
        user,
        upcoming_events,
    }))
}

/// Changes the caller's own password after re-checking the current one.
pub async fn change_password(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = fetch_user(&pool, claims.user_id()?).await?;

    if !verify_password(&payload.current_password, &user.password)? {
        return Err(AppError::AuthError(
            "Current password is incorrect".to_string(),
        ));
    }

    let hashed = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hashed)
        .bind(user.id)
        .execute(&pool)
        .await?;

    tracing::info!("User {} changed their password", user.username);
    Ok(StatusCode::NO_CONTENT)
}
