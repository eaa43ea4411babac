// src/handlers/mod.rs

use sqlx::SqlitePool;

use crate::error::AppError;

pub mod accounts;
pub mod auth;
pub mod certificates;
pub mod classes;
pub mod events;
pub mod imports;
pub mod schedule;
pub mod staff;
pub mod students;
pub mod subjects;

/// Rejects a request that references a row which does not exist.
/// `table` is always a literal from this crate, never user input.
pub(crate) async fn ensure_exists(
    pool: &SqlitePool,
    table: &'static str,
    id: i64,
    what: &str,
) -> Result<(), AppError> {
    let found: Option<i64> = sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    found
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest(format!("{what} #{id} does not exist")))
}
