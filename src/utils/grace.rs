use chrono::{DateTime, Duration, Utc};

/// Whole days elapsed since `created_at`.
pub fn days_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days()
}

/// An active account that never logged in and is older than the grace period.
pub fn is_inactive(
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    grace_period_days: i64,
) -> bool {
    is_active && last_login_at.is_none() && now - created_at > Duration::days(grace_period_days)
}
