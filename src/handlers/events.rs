// src/handlers/events.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::ensure_exists,
    models::exam_event::{
        CreateEventRequest, EventListParams, ExamEvent, STATUS_CANCELLED, STATUS_SCHEDULED,
        UpdateEventRequest, UpdateStatusRequest, validate_event_type,
    },
    utils::{
        booking::{BookedSlot, check_booking},
        jwt::Claims,
    },
};

async fn fetch_event(pool: &SqlitePool, id: i64) -> Result<ExamEvent, AppError> {
    sqlx::query_as::<_, ExamEvent>("SELECT * FROM exam_events WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Exam event not found".to_string()))
}

/// Loads every event of `class_id` on `date` and runs the booking rules against them.
async fn ensure_bookable(
    conn: &mut SqliteConnection,
    class_id: i64,
    date: NaiveDate,
    event_type: &str,
    period: i64,
    exclude_id: Option<i64>,
) -> Result<(), AppError> {
    let same_day = sqlx::query_as::<_, BookedSlot>(
        "SELECT id, event_type, period, status FROM exam_events WHERE class_id = ? AND event_date = ?",
    )
    .bind(class_id)
    .bind(date)
    .fetch_all(conn)
    .await?;

    check_booking(event_type, period, exclude_id, &same_day)?;
    Ok(())
}

/// Opens a transaction holding the write lock, so concurrent bookings run one at a time.
async fn begin_booking(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, AppError> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

fn ensure_period(period: i64, config: &Config) -> Result<(), AppError> {
    if period < 1 || period > config.periods_per_day {
        return Err(AppError::BadRequest(format!(
            "Period must be between 1 and {}",
            config.periods_per_day
        )));
    }
    Ok(())
}

fn ensure_not_past(date: NaiveDate) -> Result<(), AppError> {
    if date < Utc::now().date_naive() {
        return Err(AppError::BadRequest(
            "Events cannot be booked in the past".to_string(),
        ));
    }
    Ok(())
}

/// Only the staff member who booked an event, or an admin, may change it.
fn ensure_can_modify(claims: &Claims, event: &ExamEvent) -> Result<(), AppError> {
    if event.created_by != claims.user_id()? && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "Only the creator or an admin can modify this event".to_string(),
        ));
    }
    Ok(())
}

/// Lists events with optional filters. `mine=true` restricts to the caller's bookings.
pub async fn list_events(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<EventListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM exam_events WHERE 1 = 1");

    if let Some(class_id) = params.class_id {
        builder.push(" AND class_id = ");
        builder.push_bind(class_id);
    }
    if let Some(subject_id) = params.subject_id {
        builder.push(" AND subject_id = ");
        builder.push_bind(subject_id);
    }
    if let Some(event_type) = params.event_type {
        builder.push(" AND event_type = ");
        builder.push_bind(event_type);
    }
    if let Some(status) = params.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(from) = params.from {
        builder.push(" AND event_date >= ");
        builder.push_bind(from);
    }
    if let Some(to) = params.to {
        builder.push(" AND event_date <= ");
        builder.push_bind(to);
    }
    if params.mine {
        builder.push(" AND created_by = ");
        builder.push_bind(claims.user_id()?);
    }

    builder.push(" ORDER BY event_date, period, id");

    let events: Vec<ExamEvent> = builder.build_query_as().fetch_all(&pool).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_event(&pool, id).await?))
}

/// Books a new event for a class.
///
/// * Rejects past dates and periods outside the configured day.
/// * Enforces the quiz limit and slot rules in the same transaction as the insert.
pub async fn create_event(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_period(payload.period, &config)?;
    ensure_not_past(payload.event_date)?;

    ensure_exists(&pool, "classes", payload.class_id, "Class").await?;
    ensure_exists(&pool, "subjects", payload.subject_id, "Subject").await?;

    let user_id = claims.user_id()?;
    let now = Utc::now();

    let mut tx = begin_booking(&pool).await?;

    ensure_bookable(
        &mut tx,
        payload.class_id,
        payload.event_date,
        &payload.event_type,
        payload.period,
        None,
    )
    .await?;

    let event = sqlx::query_as::<_, ExamEvent>(
        r#"
        INSERT INTO exam_events
        (title, event_type, event_date, period, class_id, subject_id, notes, created_by, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(payload.title.trim())
    .bind(&payload.event_type)
    .bind(payload.event_date)
    .bind(payload.period)
    .bind(payload.class_id)
    .bind(payload.subject_id)
    .bind(&payload.notes)
    .bind(user_id)
    .bind(STATUS_SCHEDULED)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam event: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tx.commit().await?;

    tracing::info!(
        "Booked {} #{} for class #{} on {} period {}",
        event.event_type,
        event.id,
        event.class_id,
        event.event_date,
        event.period
    );

    Ok((StatusCode::CREATED, Json(event)))
}

/// Edits an event. Omitted fields keep their current values; the booking rules are
/// re-checked against the merged result unless the event is cancelled.
pub async fn update_event(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let current = fetch_event(&pool, id).await?;
    ensure_can_modify(&claims, &current)?;

    if let Some(event_type) = &payload.event_type {
        validate_event_type(event_type)
            .map_err(|_| AppError::BadRequest(format!("Invalid event type '{event_type}'")))?;
    }

    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .unwrap_or(&current.title)
        .to_string();
    let event_type = payload.event_type.unwrap_or(current.event_type);
    let event_date = payload.event_date.unwrap_or(current.event_date);
    let period = payload.period.unwrap_or(current.period);
    let class_id = payload.class_id.unwrap_or(current.class_id);
    let subject_id = payload.subject_id.unwrap_or(current.subject_id);
    let notes = payload.notes.unwrap_or(current.notes);

    if notes.as_ref().is_some_and(|n| n.chars().count() > 2000) {
        return Err(AppError::BadRequest(
            "Notes must be at most 2000 characters".to_string(),
        ));
    }

    ensure_period(period, &config)?;
    if event_date != current.event_date {
        ensure_not_past(event_date)?;
    }
    if class_id != current.class_id {
        ensure_exists(&pool, "classes", class_id, "Class").await?;
    }
    if subject_id != current.subject_id {
        ensure_exists(&pool, "subjects", subject_id, "Subject").await?;
    }

    let mut tx = begin_booking(&pool).await?;

    if current.status != STATUS_CANCELLED {
        ensure_bookable(&mut tx, class_id, event_date, &event_type, period, Some(id)).await?;
    }

    let event = sqlx::query_as::<_, ExamEvent>(
        r#"
        UPDATE exam_events
        SET title = ?, event_type = ?, event_date = ?, period = ?, class_id = ?,
            subject_id = ?, notes = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(title)
    .bind(event_type)
    .bind(event_date)
    .bind(period)
    .bind(class_id)
    .bind(subject_id)
    .bind(notes)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(event))
}

/// Marks an event scheduled, completed or cancelled.
/// Bringing a cancelled event back re-runs the booking rules, since its slot may be taken.
pub async fn update_event_status(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let current = fetch_event(&pool, id).await?;
    ensure_can_modify(&claims, &current)?;

    let mut tx = begin_booking(&pool).await?;

    if current.status == STATUS_CANCELLED && payload.status != STATUS_CANCELLED {
        ensure_bookable(
            &mut tx,
            current.class_id,
            current.event_date,
            &current.event_type,
            current.period,
            Some(id),
        )
        .await?;
    }

    let event = sqlx::query_as::<_, ExamEvent>(
        "UPDATE exam_events SET status = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(&payload.status)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Exam event #{} is now {}", id, event.status);
    Ok(Json(event))
}

pub async fn delete_event(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let current = fetch_event(&pool, id).await?;
    ensure_can_modify(&claims, &current)?;

    sqlx::query("DELETE FROM exam_events WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete exam event: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!("Deleted exam event #{}", id);
    Ok(StatusCode::NO_CONTENT)
}
