// tests/common/mod.rs
#![allow(dead_code)]

use chrono::{Duration, NaiveDate, Utc};
use exam_portal::{config::Config, db, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::SqlitePool;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestApp {
    pub address: String,
    /// Same pool the server uses, for seeding rows the API cannot create.
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port backed by a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to open in-memory database");

    spawn_app_on(pool).await
}

/// Spawns the app over the given pool after migrating and seeding it.
pub async fn spawn_app_on(pool: SqlitePool) -> TestApp {
    db::run_migrations(&pool)
        .await
        .expect("Failed to migrate database");

    db::create_admin_if_missing(&pool, ADMIN_USERNAME, ADMIN_PASSWORD)
        .await
        .expect("Failed to seed admin");

    let config = Config::for_tests("test_secret_for_integration_tests");
    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

/// A date `days` from today, as sent over the API.
pub fn days_from_now(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let body = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
            .json::<Value>()
            .await
            .unwrap();
        body["token"]
            .as_str()
            .unwrap_or_else(|| panic!("login failed for {username}: {body}"))
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates a staff account through the admin API and returns its id.
    pub async fn create_staff(&self, admin: &str, username: &str, password: &str) -> i64 {
        let response = self
            .post(
                "/api/admin/staff",
                admin,
                json!({
                    "username": username,
                    "password": password,
                    "full_name": format!("Teacher {username}"),
                    "role": "staff"
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }

    pub async fn create_class(&self, admin: &str, name: &str) -> i64 {
        let response = self
            .post("/api/admin/classes", admin, json!({ "name": name, "grade_level": 10 }))
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }

    pub async fn create_subject(&self, admin: &str, code: &str, name: &str) -> i64 {
        let response = self
            .post("/api/admin/subjects", admin, json!({ "code": code, "name": name }))
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }

    pub async fn create_student(
        &self,
        admin: &str,
        number: &str,
        name: &str,
        class_id: Option<i64>,
    ) -> i64 {
        let response = self
            .post(
                "/api/admin/students",
                admin,
                json!({ "student_number": number, "full_name": name, "class_id": class_id }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }

    /// Books an event and returns the raw response.
    pub async fn book(
        &self,
        token: &str,
        event_type: &str,
        class_id: i64,
        subject_id: i64,
        date: NaiveDate,
        period: i64,
    ) -> reqwest::Response {
        self.post(
            "/api/events",
            token,
            json!({
                "title": format!("{event_type} in period {period}"),
                "event_type": event_type,
                "event_date": date,
                "period": period,
                "class_id": class_id,
                "subject_id": subject_id
            }),
        )
        .await
    }
}
