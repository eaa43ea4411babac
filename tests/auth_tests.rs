// tests/auth_tests.rs

mod common;

use common::{ADMIN_PASSWORD, ADMIN_USERNAME, spawn_app};
use serde_json::{Value, json};

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn login_returns_bearer_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["role"], "admin");
    assert_eq!(body["expires_in"], 600);
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let app = spawn_app().await;

    for (username, password) in [(ADMIN_USERNAME, "wrong-password"), ("nobody", "whatever")] {
        let response = app
            .client
            .post(app.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status().as_u16(), 401);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid username or password");
    }
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = spawn_app().await;

    let missing = app
        .client
        .get(app.url("/api/me"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(missing.status().as_u16(), 401);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "Missing or malformed Authorization header");

    let garbage = app.get("/api/me", "not.a.token").await;
    assert_eq!(garbage.status().as_u16(), 401);
    let body: Value = garbage.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn admin_gate_answers_with_json_error() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_staff(&admin, "jdoe", "password123").await;
    let staff = app.login("jdoe", "password123").await;

    let response = app.get("/api/admin/staff", &staff).await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
async fn me_reports_profile_and_stamps_last_login() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let response = app.get("/api/me", &token).await;
    assert_eq!(response.status().as_u16(), 200);

    let me: Value = response.json().await.unwrap();
    assert_eq!(me["username"], ADMIN_USERNAME);
    assert_eq!(me["role"], "admin");
    assert_eq!(me["upcoming_events"], 0);
    assert!(me["last_login_at"].is_string());
    assert!(me.get("password").is_none());
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_staff(&admin, "jdoe", "first-pass").await;
    let token = app.login("jdoe", "first-pass").await;

    let wrong = app
        .put(
            "/api/me/password",
            &token,
            json!({ "current_password": "guess", "new_password": "second-pass" }),
        )
        .await;
    assert_eq!(wrong.status().as_u16(), 401);

    let ok = app
        .put(
            "/api/me/password",
            &token,
            json!({ "current_password": "first-pass", "new_password": "second-pass" }),
        )
        .await;
    assert_eq!(ok.status().as_u16(), 204);

    let old = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": "jdoe", "password": "first-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(old.status().as_u16(), 401);

    app.login("jdoe", "second-pass").await;
}

#[tokio::test]
async fn deactivated_account_is_locked_out() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let id = app.create_staff(&admin, "jdoe", "password123").await;
    let staff_token = app.login("jdoe", "password123").await;

    let response = app
        .put(
            &format!("/api/admin/staff/{id}"),
            &admin,
            json!({ "is_active": false }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["is_active"], false);

    // Existing tokens stop working immediately
    let me = app.get("/api/me", &staff_token).await;
    assert_eq!(me.status().as_u16(), 403);

    let login = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": "jdoe", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 403);
}
