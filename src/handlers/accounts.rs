// src/handlers/accounts.rs

use std::time::Duration;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    config::Config,
    error::AppError,
    models::user::{InactiveAccount, ROLE_ADMIN, User},
    utils::{
        grace::{days_since, is_inactive},
        jwt::Claims,
    },
};

/// Active accounts that have gone unused past the grace period.
pub async fn find_inactive(
    pool: &SqlitePool,
    grace_period_days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<InactiveAccount>, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE is_active = TRUE AND last_login_at IS NULL ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(users
        .into_iter()
        .filter(|u| is_inactive(u.is_active, u.created_at, u.last_login_at, now, grace_period_days))
        .map(|u| InactiveAccount {
            days_since_creation: days_since(u.created_at, now),
            id: u.id,
            username: u.username,
            full_name: u.full_name,
            email: u.email,
            role: u.role,
            created_at: u.created_at,
        })
        .collect())
}

/// Deactivates the flagged accounts, never touching `keep_id` (and admins, unless
/// `include_admins`). Returns how many changed.
pub async fn deactivate_inactive(
    pool: &SqlitePool,
    grace_period_days: i64,
    keep_id: Option<i64>,
    include_admins: bool,
) -> Result<u64, AppError> {
    let ids: Vec<i64> = find_inactive(pool, grace_period_days, Utc::now())
        .await?
        .into_iter()
        .filter(|a| include_admins || a.role != ROLE_ADMIN)
        .map(|a| a.id)
        .filter(|id| Some(*id) != keep_id)
        .collect();

    if ids.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("UPDATE users SET is_active = FALSE WHERE id IN (");
    let mut separated = builder.separated(",");
    for id in &ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Lists accounts flagged by the grace-period rule.
/// Admin only.
pub async fn list_inactive(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    let accounts = find_inactive(&pool, config.grace_period_days, Utc::now()).await?;
    Ok(Json(accounts))
}

/// Deactivates every flagged account except the caller's.
/// Admin only.
pub async fn deactivate_inactive_accounts(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let deactivated =
        deactivate_inactive(&pool, config.grace_period_days, Some(claims.user_id()?), true)
            .await?;

    tracing::info!("Deactivated {} inactive account(s)", deactivated);
    Ok(Json(serde_json::json!({ "deactivated": deactivated })))
}

/// Periodically reports, and optionally deactivates, inactive accounts.
/// Unattended runs leave admin accounts alone so the portal cannot lock itself out.
/// Runs until the process exits; does nothing when the interval is 0.
pub async fn run_inactivity_sweep(pool: SqlitePool, config: Config) {
    if config.inactivity_sweep_secs == 0 {
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.inactivity_sweep_secs));
    loop {
        interval.tick().await;

        let result = if config.auto_deactivate {
            deactivate_inactive(&pool, config.grace_period_days, None, false)
                .await
                .map(|n| {
                    if n > 0 {
                        tracing::info!("Inactivity sweep deactivated {} account(s)", n);
                    }
                })
        } else {
            find_inactive(&pool, config.grace_period_days, Utc::now())
                .await
                .map(|flagged| {
                    if !flagged.is_empty() {
                        tracing::info!(
                            "Inactivity sweep: {} account(s) unused past the {}-day grace period",
                            flagged.len(),
                            config.grace_period_days
                        );
                    }
                })
        };

        if let Err(e) = result {
            tracing::warn!("Inactivity sweep failed: {}", e);
        }
    }
}
