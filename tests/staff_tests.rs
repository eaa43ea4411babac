// tests/staff_tests.rs

mod common;

use common::spawn_app;
use serde_json::{Value, json};

#[tokio::test]
async fn admin_manages_staff_accounts() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let id = app.create_staff(&admin, "jdoe", "password123").await;

    let duplicate = app
        .post(
            "/api/admin/staff",
            &admin,
            json!({ "username": "jdoe", "password": "password123", "full_name": "Again", "role": "staff" }),
        )
        .await;
    assert_eq!(duplicate.status().as_u16(), 409);

    let listed: Vec<Value> = app
        .get("/api/admin/staff", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|u| u.get("password").is_none()));

    let promoted: Value = app
        .put(&format!("/api/admin/staff/{id}"), &admin, json!({ "role": "admin" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(promoted["role"], "admin");

    let deleted = app.delete(&format!("/api/admin/staff/{id}"), &admin).await;
    assert_eq!(deleted.status().as_u16(), 204);

    let again = app.delete(&format!("/api/admin/staff/{id}"), &admin).await;
    assert_eq!(again.status().as_u16(), 404);
}

#[tokio::test]
async fn staff_payload_is_validated() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let short_name = app
        .post(
            "/api/admin/staff",
            &admin,
            json!({ "username": "yo", "password": "password123", "full_name": "Yo", "role": "staff" }),
        )
        .await;
    assert_eq!(short_name.status().as_u16(), 400);

    let bad_role = app
        .post(
            "/api/admin/staff",
            &admin,
            json!({ "username": "principal", "password": "password123", "full_name": "P", "role": "principal" }),
        )
        .await;
    assert_eq!(bad_role.status().as_u16(), 400);
}

#[tokio::test]
async fn admin_cannot_lock_themselves_out() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let me: Value = app.get("/api/me", &admin).await.json().await.unwrap();
    let my_id = me["id"].as_i64().unwrap();

    let deactivate = app
        .put(&format!("/api/admin/staff/{my_id}"), &admin, json!({ "is_active": false }))
        .await;
    assert_eq!(deactivate.status().as_u16(), 400);

    let demote = app
        .put(&format!("/api/admin/staff/{my_id}"), &admin, json!({ "role": "staff" }))
        .await;
    assert_eq!(demote.status().as_u16(), 400);

    let delete = app.delete(&format!("/api/admin/staff/{my_id}"), &admin).await;
    assert_eq!(delete.status().as_u16(), 400);
}

#[tokio::test]
async fn staff_cannot_reach_admin_routes() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_staff(&admin, "jdoe", "password123").await;
    let staff = app.login("jdoe", "password123").await;

    let response = app.get("/api/admin/staff", &staff).await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn staff_who_booked_events_cannot_be_deleted() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let id = app.create_staff(&admin, "jdoe", "password123").await;
    let staff = app.login("jdoe", "password123").await;
    let class_id = app.create_class(&admin, "A10").await;
    let subject_id = app.create_subject(&admin, "MATH", "Mathematics").await;

    let booked = app
        .book(&staff, "exam", class_id, subject_id, common::days_from_now(3), 1)
        .await;
    assert_eq!(booked.status().as_u16(), 201);

    let response = app.delete(&format!("/api/admin/staff/{id}"), &admin).await;
    assert_eq!(response.status().as_u16(), 409);
}
