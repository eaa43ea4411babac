// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        accounts, auth, certificates, classes, events, imports, schedule, staff, students,
        subjects,
    },
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

async fn health() -> &'static str {
    "ok"
}

/// Assembles the main application router.
///
/// * Reads of reference data, events, the schedule and certificates need a login.
/// * Writes to reference data, staff management, imports and templates live under `/api/admin`.
/// * Login and certificate verification are public.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_login = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new().route("/login", post(auth::login));

    let me_routes = Router::new()
        .route("/", get(auth::get_me))
        .route("/password", put(auth::change_password))
        .route_layer(require_login.clone());

    let class_routes = Router::new()
        .route("/", get(classes::list_classes))
        .route("/{id}", get(classes::get_class))
        .route_layer(require_login.clone());

    let subject_routes = Router::new()
        .route("/", get(subjects::list_subjects))
        .route("/{id}", get(subjects::get_subject))
        .route_layer(require_login.clone());

    let student_routes = Router::new()
        .route("/", get(students::list_students))
        .route("/{id}", get(students::get_student))
        .route_layer(require_login.clone());

    let event_routes = Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route(
            "/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/{id}/status", put(events::update_event_status))
        .route_layer(require_login.clone());

    let schedule_routes = Router::new()
        .route("/", get(schedule::get_schedule))
        .route("/export", get(schedule::export_schedule))
        .route_layer(require_login.clone());

    let certificate_routes = Router::new()
        .route("/verify/{serial}", get(certificates::verify_certificate))
        // Protected certificate routes
        .merge(
            Router::new()
                .route(
                    "/",
                    get(certificates::list_certificates).post(certificates::issue_certificate),
                )
                .route("/issue-class", post(certificates::issue_class_certificates))
                .route("/templates", get(certificates::list_templates))
                .route("/templates/{id}", get(certificates::get_template))
                .route(
                    "/templates/{id}/preview",
                    get(certificates::preview_template),
                )
                .route("/{id}", get(certificates::get_certificate))
                .route("/{id}/html", get(certificates::certificate_html))
                .route("/{id}/revoke", post(certificates::revoke_certificate))
                .route_layer(require_login.clone()),
        );

    let admin_routes = Router::new()
        .route("/staff", get(staff::list_staff).post(staff::create_staff))
        .route(
            "/staff/{id}",
            put(staff::update_staff).delete(staff::delete_staff),
        )
        .route("/classes", post(classes::create_class))
        .route(
            "/classes/{id}",
            put(classes::update_class).delete(classes::delete_class),
        )
        .route("/subjects", post(subjects::create_subject))
        .route(
            "/subjects/{id}",
            put(subjects::update_subject).delete(subjects::delete_subject),
        )
        .route("/students", post(students::create_student))
        .route(
            "/students/{id}",
            put(students::update_student).delete(students::delete_student),
        )
        .route("/import/{kind}", post(imports::import_csv))
        .route("/import/{kind}/template", get(imports::download_template))
        .route("/accounts/inactive", get(accounts::list_inactive))
        .route(
            "/accounts/inactive/deactivate",
            post(accounts::deactivate_inactive_accounts),
        )
        .route(
            "/certificate-templates",
            post(certificates::create_template),
        )
        .route(
            "/certificate-templates/{id}",
            put(certificates::update_template).delete(certificates::delete_template),
        )
        // Double middleware protection: Auth first, then Admin check
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(require_login);

    let mut router = Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api/me", me_routes)
        .nest("/api/classes", class_routes)
        .nest("/api/subjects", subject_routes)
        .nest("/api/students", student_routes)
        .nest("/api/events", event_routes)
        .nest("/api/schedule", schedule_routes)
        .nest("/api/certificates", certificate_routes)
        .nest("/api/admin", admin_routes);

    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
