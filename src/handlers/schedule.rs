// src/handlers/schedule.rs

use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::{Duration, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    config::MAX_SCHEDULE_RANGE_DAYS,
    error::AppError,
    models::exam_event::{STATUS_CANCELLED, ScheduleDay, ScheduleEntry, ScheduleParams},
    utils::csv::write_record,
};

/// Resolves the requested window: `from` defaults to today, `to` to one week after `from`.
fn resolve_range(params: &ScheduleParams, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), AppError> {
    let from = params.from.unwrap_or(today);
    let to = params.to.unwrap_or(from + Duration::days(6));

    if to < from {
        return Err(AppError::BadRequest(
            "'to' must not be before 'from'".to_string(),
        ));
    }
    if (to - from).num_days() >= MAX_SCHEDULE_RANGE_DAYS {
        return Err(AppError::BadRequest(format!(
            "Schedule range cannot exceed {MAX_SCHEDULE_RANGE_DAYS} days"
        )));
    }
    Ok((from, to))
}

/// Entries are already sorted by date, so grouping only needs to watch for date changes.
fn group_by_day(entries: Vec<ScheduleEntry>) -> Vec<ScheduleDay> {
    let mut days: Vec<ScheduleDay> = Vec::new();
    for entry in entries {
        match days.last_mut() {
            Some(day) if day.date == entry.event_date => day.events.push(entry),
            _ => days.push(ScheduleDay {
                date: entry.event_date,
                events: vec![entry],
            }),
        }
    }
    days
}

async fn fetch_entries(
    pool: &SqlitePool,
    params: &ScheduleParams,
) -> Result<Vec<ScheduleEntry>, AppError> {
    let (from, to) = resolve_range(params, Utc::now().date_naive())?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT
            e.id, e.title, e.event_type, e.event_date, e.period, e.status,
            e.class_id, c.name AS class_name,
            e.subject_id, s.code AS subject_code, s.name AS subject_name,
            e.created_by, u.full_name AS creator_name,
            e.notes
        FROM exam_events e
        JOIN classes c ON e.class_id = c.id
        JOIN subjects s ON e.subject_id = s.id
        JOIN users u ON e.created_by = u.id
        WHERE e.event_date >= "#,
    );
    builder.push_bind(from);
    builder.push(" AND e.event_date <= ");
    builder.push_bind(to);

    if !params.include_cancelled {
        builder.push(" AND e.status != ");
        builder.push_bind(STATUS_CANCELLED);
    }
    if let Some(class_id) = params.class_id {
        builder.push(" AND e.class_id = ");
        builder.push_bind(class_id);
    }
    if let Some(subject_id) = params.subject_id {
        builder.push(" AND e.subject_id = ");
        builder.push_bind(subject_id);
    }
    if let Some(event_type) = &params.event_type {
        builder.push(" AND e.event_type = ");
        builder.push_bind(event_type.clone());
    }

    builder.push(" ORDER BY e.event_date, e.period, c.name, e.id");

    let entries = builder.build_query_as().fetch_all(pool).await.map_err(|e| {
        tracing::error!("Failed to load schedule: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(entries)
}

/// The master schedule, grouped by day.
pub async fn get_schedule(
    State(pool): State<SqlitePool>,
    Query(params): Query<ScheduleParams>,
) -> Result<impl IntoResponse, AppError> {
    let entries = fetch_entries(&pool, &params).await?;
    Ok(Json(group_by_day(entries)))
}

/// The same rows as `get_schedule`, one per line, as a CSV download.
pub async fn export_schedule(
    State(pool): State<SqlitePool>,
    Query(params): Query<ScheduleParams>,
) -> Result<impl IntoResponse, AppError> {
    let entries = fetch_entries(&pool, &params).await?;

    let mut csv = write_record(&[
        "date", "period", "class", "subject_code", "subject", "type", "title", "status", "booked_by",
    ]);
    for e in &entries {
        csv.push_str(&write_record(&[
            e.event_date.to_string(),
            e.period.to_string(),
            e.class_name.clone(),
            e.subject_code.clone(),
            e.subject_name.clone(),
            e.event_type.clone(),
            e.title.clone(),
            e.status.clone(),
            e.creator_name.clone(),
        ]));
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"schedule.csv\"",
            ),
        ],
        csv,
    ))
}
