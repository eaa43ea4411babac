// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;
use url::Url;

/// Length of the window after account creation before an unused account is flagged.
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 10;

/// Widest date range the master schedule will return in one request.
pub const MAX_SCHEDULE_RANGE_DAYS: i64 = 92;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Directory holding the built portal UI, served as a fallback.
    pub static_dir: Option<String>,
    /// Base for the verification links printed on certificates.
    pub public_base_url: Url,
    pub grace_period_days: i64,
    /// 0 disables the background sweep.
    pub inactivity_sweep_secs: u64,
    pub auto_deactivate: bool,
    pub periods_per_day: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let public_base_url =
            Url::parse(&public_base_url).expect("PUBLIC_BASE_URL must be a valid URL");

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 86_400),
            rust_log,
            admin_username: non_empty_var("ADMIN_USERNAME"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
            port: parse_or("PORT", 3000),
            cors_origins,
            static_dir: non_empty_var("STATIC_DIR"),
            public_base_url,
            grace_period_days: parse_or("GRACE_PERIOD_DAYS", DEFAULT_GRACE_PERIOD_DAYS),
            inactivity_sweep_secs: parse_or("INACTIVITY_SWEEP_SECS", 3600),
            auto_deactivate: parse_or("AUTO_DEACTIVATE", false),
            periods_per_day: parse_or("PERIODS_PER_DAY", 10),
        }
    }

    /// Configuration used by the integration tests: in-memory database, no seeding, no sweep.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: jwt_secret.to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            admin_username: None,
            admin_password: None,
            port: 0,
            cors_origins: Vec::new(),
            static_dir: None,
            public_base_url: Url::parse("http://portal.test").expect("static url"),
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            inactivity_sweep_secs: 0,
            auto_deactivate: false,
            periods_per_day: 10,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("{key} is not valid, using the default");
                default
            }
        },
        Err(_) => default,
    }
}
