// tests/reference_data_tests.rs

mod common;

use common::{days_from_now, spawn_app};
use serde_json::{Value, json};

#[tokio::test]
async fn class_crud_with_roster() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let class_id = app.create_class(&admin, "A10").await;
    app.create_student(&admin, "S-001", "Zoe", Some(class_id)).await;
    app.create_student(&admin, "S-002", "Adam", Some(class_id)).await;
    app.create_student(&admin, "S-003", "Nobody", None).await;

    let detail: Value = app
        .get(&format!("/api/classes/{class_id}"), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(detail["name"], "A10");
    let roster: Vec<&str> = detail["students"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["full_name"].as_str().unwrap())
        .collect();
    assert_eq!(roster, vec!["Adam", "Zoe"]);

    let renamed: Value = app
        .put(
            &format!("/api/admin/classes/{class_id}"),
            &admin,
            json!({ "name": "A11", "grade_level": 11 }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(renamed["name"], "A11");
    assert_eq!(renamed["grade_level"], 11);

    let deleted = app.delete(&format!("/api/admin/classes/{class_id}"), &admin).await;
    assert_eq!(deleted.status().as_u16(), 204);

    // Students survive, unassigned
    let students: Vec<Value> = app.get("/api/students", &admin).await.json().await.unwrap();
    assert_eq!(students.len(), 3);
    assert!(students.iter().all(|s| s["class_id"].is_null()));

    let missing = app.get(&format!("/api/classes/{class_id}"), &admin).await;
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn duplicate_names_conflict() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    app.create_class(&admin, "A10").await;
    let class = app
        .post("/api/admin/classes", &admin, json!({ "name": "A10" }))
        .await;
    assert_eq!(class.status().as_u16(), 409);

    app.create_subject(&admin, "MATH", "Mathematics").await;
    let subject = app
        .post("/api/admin/subjects", &admin, json!({ "code": "MATH", "name": "Maths" }))
        .await;
    assert_eq!(subject.status().as_u16(), 409);

    app.create_student(&admin, "S-001", "Zoe", None).await;
    let student = app
        .post(
            "/api/admin/students",
            &admin,
            json!({ "student_number": "S-001", "full_name": "Other" }),
        )
        .await;
    assert_eq!(student.status().as_u16(), 409);
}

#[tokio::test]
async fn invalid_references_are_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let student = app
        .post(
            "/api/admin/students",
            &admin,
            json!({ "student_number": "S-001", "full_name": "Zoe", "class_id": 999 }),
        )
        .await;
    assert_eq!(student.status().as_u16(), 400);

    let class = app
        .post(
            "/api/admin/classes",
            &admin,
            json!({ "name": "A10", "homeroom_staff_id": 999 }),
        )
        .await;
    assert_eq!(class.status().as_u16(), 400);

    let grade = app
        .post("/api/admin/classes", &admin, json!({ "name": "A10", "grade_level": 20 }))
        .await;
    assert_eq!(grade.status().as_u16(), 400);
}

#[tokio::test]
async fn staff_can_read_but_not_write_reference_data() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_staff(&admin, "jdoe", "password123").await;
    let staff = app.login("jdoe", "password123").await;
    app.create_class(&admin, "A10").await;

    let list = app.get("/api/classes", &staff).await;
    assert_eq!(list.status().as_u16(), 200);
    let classes: Vec<Value> = list.json().await.unwrap();
    assert_eq!(classes.len(), 1);

    let create = app
        .post("/api/admin/classes", &staff, json!({ "name": "B10" }))
        .await;
    assert_eq!(create.status().as_u16(), 403);

    let subject = app
        .post("/api/admin/subjects", &staff, json!({ "code": "BIO", "name": "Biology" }))
        .await;
    assert_eq!(subject.status().as_u16(), 403);
}

#[tokio::test]
async fn student_search_filters_by_class_and_name() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let a = app.create_class(&admin, "A10").await;
    let b = app.create_class(&admin, "B10").await;
    app.create_student(&admin, "S-001", "Maria", Some(a)).await;
    app.create_student(&admin, "S-002", "Marco", Some(b)).await;
    app.create_student(&admin, "S-003", "Tom", Some(a)).await;

    let in_a: Vec<Value> = app
        .get(&format!("/api/students?class_id={a}"), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(in_a.len(), 2);

    let named: Vec<Value> = app
        .get("/api/students?q=mar", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(named.len(), 2);

    let both: Vec<Value> = app
        .get(&format!("/api/students?q=mar&class_id={b}"), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0]["full_name"], "Marco");
}

#[tokio::test]
async fn referenced_class_and_subject_cannot_be_deleted() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let class_id = app.create_class(&admin, "A10").await;
    let subject_id = app.create_subject(&admin, "MATH", "Mathematics").await;

    let booked = app
        .book(&admin, "exam", class_id, subject_id, days_from_now(2), 3)
        .await;
    assert_eq!(booked.status().as_u16(), 201);

    let class = app.delete(&format!("/api/admin/classes/{class_id}"), &admin).await;
    assert_eq!(class.status().as_u16(), 409);

    let subject = app
        .delete(&format!("/api/admin/subjects/{subject_id}"), &admin)
        .await;
    assert_eq!(subject.status().as_u16(), 409);
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let subject = app
        .post("/api/admin/subjects", &admin, json!({ "code": "   ", "name": "  " }))
        .await;
    assert_eq!(subject.status().as_u16(), 400);

    let class = app
        .post("/api/admin/classes", &admin, json!({ "name": "   " }))
        .await;
    assert_eq!(class.status().as_u16(), 400);

    let student = app
        .post(
            "/api/admin/students",
            &admin,
            json!({ "student_number": "S-001", "full_name": "\t " }),
        )
        .await;
    assert_eq!(student.status().as_u16(), 400);

    let class_id = app.create_class(&admin, "A10").await;
    let rename = app
        .put(
            &format!("/api/admin/classes/{class_id}"),
            &admin,
            json!({ "name": "  " }),
        )
        .await;
    assert_eq!(rename.status().as_u16(), 400);

    // Surrounding whitespace is dropped from accepted values
    let padded: Value = app
        .post("/api/admin/subjects", &admin, json!({ "code": " BIO ", "name": " Biology" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(padded["code"], "BIO");
    assert_eq!(padded["name"], "Biology");
}

#[tokio::test]
async fn null_clears_optional_references() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let teacher = app.create_staff(&admin, "jdoe", "password123").await;
    let class_id = app.create_class(&admin, "A10").await;
    let student_id = app.create_student(&admin, "S-001", "Zoe", Some(class_id)).await;

    let assigned: Value = app
        .put(
            &format!("/api/admin/classes/{class_id}"),
            &admin,
            json!({ "homeroom_staff_id": teacher }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(assigned["homeroom_staff_id"], teacher);

    // Omitting the field leaves it alone
    let renamed: Value = app
        .put(
            &format!("/api/admin/classes/{class_id}"),
            &admin,
            json!({ "name": "A11" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(renamed["homeroom_staff_id"], teacher);

    let unassigned: Value = app
        .put(
            &format!("/api/admin/classes/{class_id}"),
            &admin,
            json!({ "homeroom_staff_id": null }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert!(unassigned["homeroom_staff_id"].is_null());
    assert_eq!(unassigned["name"], "A11");

    let moved: Value = app
        .put(
            &format!("/api/admin/students/{student_id}"),
            &admin,
            json!({ "full_name": "Zoe Park" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(moved["class_id"], class_id);

    let removed: Value = app
        .put(
            &format!("/api/admin/students/{student_id}"),
            &admin,
            json!({ "class_id": null }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert!(removed["class_id"].is_null());
    assert_eq!(removed["full_name"], "Zoe Park");
}
