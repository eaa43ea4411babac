// src/handlers/imports.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::ValidateEmail;

use crate::{
    error::{AppError, conflict_on_constraint},
    models::{
        import::{ImportKind, ImportParams, ImportReport, RowError},
        user::{ROLE_STAFF, validate_role},
    },
    utils::{
        csv::{CsvRow, CsvTable, write_record},
        hash::hash_password,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StaffRow {
    username: String,
    full_name: String,
    email: Option<String>,
    role: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubjectRow {
    code: String,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClassRow {
    name: String,
    grade_level: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StudentRow {
    student_number: String,
    full_name: String,
    class_id: Option<i64>,
    email: Option<String>,
}

/// Rows that passed validation, plus one error per rejected row.
type Checked<T> = (Vec<T>, Vec<RowError>);

fn row_error(row: &CsvRow, message: impl Into<String>) -> RowError {
    RowError {
        line: row.line,
        message: message.into(),
    }
}

fn parse_kind(raw: &str) -> Result<ImportKind, AppError> {
    ImportKind::parse(raw).ok_or(AppError::NotFound(format!("Unknown import type '{raw}'")))
}

fn check_length(value: &str, field: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{field} must be at most {max} characters"));
    }
    Ok(())
}

fn check_email(email: &Option<String>) -> Result<(), String> {
    match email {
        Some(e) if !e.validate_email() => Err(format!("'{e}' is not a valid email")),
        _ => Ok(()),
    }
}

/// Marks `key` as taken, or explains why it already was.
fn claim_key(
    key: &str,
    existing: &HashSet<String>,
    seen: &mut HashSet<String>,
    what: &str,
) -> Result<(), String> {
    if existing.contains(key) {
        return Err(format!("{what} '{key}' already exists"));
    }
    if !seen.insert(key.to_string()) {
        return Err(format!("{what} '{key}' appears more than once in the file"));
    }
    Ok(())
}

pub(crate) fn check_staff(table: &CsvTable, existing: &HashSet<String>) -> Checked<StaffRow> {
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for row in &table.rows {
        let parsed = (|| -> Result<StaffRow, String> {
            let username = table.get(row, "username").ok_or("username is required")?;
            let full_name = table.get(row, "full_name").ok_or("full_name is required")?;
            let password = table.get(row, "password").ok_or("password is required")?;
            let email = table.get(row, "email");
            let role = table
                .get(row, "role")
                .map(|r| r.to_ascii_lowercase())
                .unwrap_or_else(|| ROLE_STAFF.to_string());

            let username_len = username.chars().count();
            if !(3..=50).contains(&username_len) {
                return Err("username must be between 3 and 50 characters".to_string());
            }
            check_length(&full_name, "full_name", 100)?;
            if !(4..=128).contains(&password.chars().count()) {
                return Err("password must be between 4 and 128 characters".to_string());
            }
            check_email(&email)?;
            validate_role(&role).map_err(|_| format!("role '{role}' must be admin or staff"))?;
            claim_key(&username, existing, &mut seen, "Username")?;

            Ok(StaffRow {
                username,
                full_name,
                email,
                role,
                password,
            })
        })();

        match parsed {
            Ok(r) => rows.push(r),
            Err(msg) => errors.push(row_error(row, msg)),
        }
    }
    (rows, errors)
}

pub(crate) fn check_subjects(table: &CsvTable, existing: &HashSet<String>) -> Checked<SubjectRow> {
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for row in &table.rows {
        let parsed = (|| -> Result<SubjectRow, String> {
            let code = table.get(row, "code").ok_or("code is required")?;
            let name = table.get(row, "name").ok_or("name is required")?;
            check_length(&code, "code", 20)?;
            check_length(&name, "name", 100)?;
            claim_key(&code, existing, &mut seen, "Subject code")?;
            Ok(SubjectRow { code, name })
        })();

        match parsed {
            Ok(r) => rows.push(r),
            Err(msg) => errors.push(row_error(row, msg)),
        }
    }
    (rows, errors)
}

pub(crate) fn check_classes(table: &CsvTable, existing: &HashSet<String>) -> Checked<ClassRow> {
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for row in &table.rows {
        let parsed = (|| -> Result<ClassRow, String> {
            let name = table.get(row, "name").ok_or("name is required")?;
            check_length(&name, "name", 50)?;
            let grade_level = match table.get(row, "grade_level") {
                Some(raw) => match raw.parse::<i64>() {
                    Ok(g) if (1..=13).contains(&g) => Some(g),
                    _ => return Err(format!("grade_level '{raw}' must be a number from 1 to 13")),
                },
                None => None,
            };
            claim_key(&name, existing, &mut seen, "Class")?;
            Ok(ClassRow { name, grade_level })
        })();

        match parsed {
            Ok(r) => rows.push(r),
            Err(msg) => errors.push(row_error(row, msg)),
        }
    }
    (rows, errors)
}

pub(crate) fn check_students(
    table: &CsvTable,
    existing: &HashSet<String>,
    classes: &HashMap<String, i64>,
) -> Checked<StudentRow> {
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for row in &table.rows {
        let parsed = (|| -> Result<StudentRow, String> {
            let student_number = table
                .get(row, "student_number")
                .ok_or("student_number is required")?;
            let full_name = table.get(row, "full_name").ok_or("full_name is required")?;
            check_length(&student_number, "student_number", 30)?;
            check_length(&full_name, "full_name", 100)?;
            let email = table.get(row, "email");
            check_email(&email)?;
            let class_id = match table.get(row, "class_name") {
                Some(name) => Some(
                    *classes
                        .get(&name)
                        .ok_or_else(|| format!("class '{name}' does not exist"))?,
                ),
                None => None,
            };
            claim_key(&student_number, existing, &mut seen, "Student number")?;
            Ok(StudentRow {
                student_number,
                full_name,
                class_id,
                email,
            })
        })();

        match parsed {
            Ok(r) => rows.push(r),
            Err(msg) => errors.push(row_error(row, msg)),
        }
    }
    (rows, errors)
}

async fn existing_keys(pool: &SqlitePool, sql: &str) -> Result<HashSet<String>, AppError> {
    let keys: Vec<String> = sqlx::query_scalar(sql).fetch_all(pool).await?;
    Ok(keys.into_iter().collect())
}

/// Downloads the header-only CSV for an import type.
/// Admin only.
pub async fn download_template(Path(kind): Path<String>) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let disposition = format!("attachment; filename=\"{}_template.csv\"", kind.as_str());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        write_record(kind.columns()),
    ))
}

/// Bulk-creates reference data from an uploaded CSV body.
///
/// * Invalid and duplicate rows are skipped and reported with their line number.
/// * All accepted rows are written in a single transaction.
/// * With `dry_run=true` nothing is written; `imported` is what would have been.
/// Admin only.
pub async fn import_csv(
    State(pool): State<SqlitePool>,
    Path(kind): Path<String>,
    Query(params): Query<ImportParams>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;

    let table = CsvTable::parse(&body)
        .ok_or(AppError::BadRequest("The uploaded file is empty".to_string()))?;

    let missing = table.missing_columns(kind.required_columns());
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required column(s): {}",
            missing.join(", ")
        )));
    }

    let total_rows = table.rows.len();
    let now = Utc::now();

    let (imported, errors) = match kind {
        ImportKind::Staff => {
            let existing = existing_keys(&pool, "SELECT username FROM users").await?;
            let (rows, errors) = check_staff(&table, &existing);
            if !params.dry_run {
                let mut hashed = Vec::with_capacity(rows.len());
                for r in &rows {
                    hashed.push(hash_password(&r.password)?);
                }
                let mut tx = pool.begin().await?;
                for (r, password) in rows.iter().zip(hashed) {
                    sqlx::query(
                        "INSERT INTO users (username, password, full_name, email, role, is_active, created_at)
                         VALUES (?, ?, ?, ?, ?, TRUE, ?)",
                    )
                    .bind(&r.username)
                    .bind(password)
                    .bind(&r.full_name)
                    .bind(&r.email)
                    .bind(&r.role)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| conflict_on_constraint(e, "Import collided with a concurrent change"))?;
                }
                tx.commit().await?;
            }
            (rows.len(), errors)
        }
        ImportKind::Subjects => {
            let existing = existing_keys(&pool, "SELECT code FROM subjects").await?;
            let (rows, errors) = check_subjects(&table, &existing);
            if !params.dry_run {
                let mut tx = pool.begin().await?;
                for r in &rows {
                    sqlx::query("INSERT INTO subjects (code, name, created_at) VALUES (?, ?, ?)")
                        .bind(&r.code)
                        .bind(&r.name)
                        .bind(now)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| conflict_on_constraint(e, "Import collided with a concurrent change"))?;
                }
                tx.commit().await?;
            }
            (rows.len(), errors)
        }
        ImportKind::Classes => {
            let existing = existing_keys(&pool, "SELECT name FROM classes").await?;
            let (rows, errors) = check_classes(&table, &existing);
            if !params.dry_run {
                let mut tx = pool.begin().await?;
                for r in &rows {
                    sqlx::query("INSERT INTO classes (name, grade_level, created_at) VALUES (?, ?, ?)")
                        .bind(&r.name)
                        .bind(r.grade_level)
                        .bind(now)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| conflict_on_constraint(e, "Import collided with a concurrent change"))?;
                }
                tx.commit().await?;
            }
            (rows.len(), errors)
        }
        ImportKind::Students => {
            let existing = existing_keys(&pool, "SELECT student_number FROM students").await?;
            let classes: HashMap<String, i64> =
                sqlx::query_as::<_, (String, i64)>("SELECT name, id FROM classes")
                    .fetch_all(&pool)
                    .await?
                    .into_iter()
                    .collect();
            let (rows, errors) = check_students(&table, &existing, &classes);
            if !params.dry_run {
                let mut tx = pool.begin().await?;
                for r in &rows {
                    sqlx::query(
                        "INSERT INTO students (student_number, full_name, class_id, email, created_at)
                         VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(&r.student_number)
                    .bind(&r.full_name)
                    .bind(r.class_id)
                    .bind(&r.email)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| conflict_on_constraint(e, "Import collided with a concurrent change"))?;
                }
                tx.commit().await?;
            }
            (rows.len(), errors)
        }
    };

    tracing::info!(
        "{} import of {}: {} accepted, {} skipped",
        if params.dry_run { "Dry-run" } else { "Applied" },
        kind.as_str(),
        imported,
        errors.len()
    );

    Ok(Json(ImportReport {
        kind: kind.as_str(),
        total_rows,
        imported,
        skipped: errors.len(),
        errors,
        dry_run: params.dry_run,
    }))
}
