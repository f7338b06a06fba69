//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Rate limiter → 2. Auth validator → 3. Audit logger
//!
//! Public routes carry only the rate limiter.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router with default rate limits.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    api_router_with_ctx(ApiContext::new(core))
}

/// Build router from a pre-constructed `ApiContext` (custom limits in tests).
pub fn api_router_with_ctx(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Rate limit → Auth → Audit (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::book),
        )
        .route(
            "/appointments/:id/cancel",
            post(endpoints::appointments::cancel),
        )
        .route(
            "/appointments/:id/complete",
            post(endpoints::appointments::complete),
        )
        .route("/appointments/:id/pay", post(endpoints::appointments::pay))
        .route("/doctor/dashboard", get(endpoints::dashboard::doctor))
        .route(
            "/doctor/profile",
            get(endpoints::doctors::profile).post(endpoints::doctors::update_profile),
        )
        .route(
            "/doctor/availability",
            post(endpoints::doctors::toggle_own_availability),
        )
        .route("/admin/dashboard", get(endpoints::dashboard::admin))
        .route("/admin/doctors", post(endpoints::admin::add_doctor))
        .route(
            "/admin/availability",
            post(endpoints::admin::change_availability),
        )
        .route(
            "/patient/profile",
            get(endpoints::patients::profile).post(endpoints::patients::update_profile),
        )
        .route(
            "/vitals/readings/:id",
            put(endpoints::vitals::update).delete(endpoints::vitals::delete),
        )
        .route(
            "/vitals/:kind",
            get(endpoints::vitals::list).post(endpoints::vitals::record),
        )
        .route(
            "/vitals/:kind/analytics",
            get(endpoints::vitals::analytics),
        )
        .route("/vitals/:kind/trends", get(endpoints::vitals::trends))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/doctors", get(endpoints::doctors::list))
        .route("/doctors/:id/slots", get(endpoints::doctors::slots))
        .route("/patients/register", post(endpoints::patients::register))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", public)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::types::RateLimiter;
    use crate::config::LifecyclePolicy;

    const ADMIN: &str = "admin-secret";

    fn test_core() -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let core = CoreState::new(tmp.path().join("api.db"), LifecyclePolicy::default())
            .with_admin_token(ADMIN);
        (Arc::new(core), tmp)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn add_doctor(app: &Router, email: &str, fees: f64) -> (String, String) {
        let (status, json) = send(
            app,
            "POST",
            "/api/admin/doctors",
            Some(ADMIN),
            Some(json!({
                "name": "Dr Richard James",
                "email": email,
                "speciality": "General physician",
                "degree": "MBBS",
                "experience": "4 Years",
                "about": "Primary care",
                "fees": fees,
                "address": "17th Cross, Richmond"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        (
            json["doctor"]["id"].as_str().unwrap().to_string(),
            json["token"].as_str().unwrap().to_string(),
        )
    }

    async fn register(app: &Router, email: &str) -> String {
        let (status, json) = send(
            app,
            "POST",
            "/api/patients/register",
            None,
            Some(json!({ "name": "Patient", "email": email })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        json["token"].as_str().unwrap().to_string()
    }

    fn booking(doctor_id: &str) -> Value {
        json!({ "doctorId": doctor_id, "slotDate": "2025-03-01", "slotTime": "10:00 AM" })
    }

    #[tokio::test]
    async fn health_is_public() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let (status, json) = send(&app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["version"], crate::config::APP_VERSION);
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let (core, _tmp) = test_core();
        let app = api_router(core);

        let (status, json) = send(&app, "GET", "/api/appointments", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "AUTH_REQUIRED");

        let (status, _) = send(&app, "GET", "/api/appointments", Some("forged"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn booking_lifecycle_over_http() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let (doctor_id, doctor_token) = add_doctor(&app, "d1@clinic.example", 500.0).await;
        let p1 = register(&app, "p1@example.com").await;
        let p2 = register(&app, "p2@example.com").await;

        let (status, json) =
            send(&app, "POST", "/api/appointments", Some(&p1), Some(booking(&doctor_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["appointment"]["amount"], 500.0);
        assert_eq!(json["appointment"]["cancelled"], false);
        let first = json["appointment"]["id"].as_str().unwrap().to_string();

        let (status, json) =
            send(&app, "POST", "/api/appointments", Some(&p2), Some(booking(&doctor_id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "SLOT_CONFLICT");

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/appointments/{first}/cancel"),
            Some(&p2),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(
            &app,
            "POST",
            &format!("/api/appointments/{first}/cancel"),
            Some(&p1),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["appointment"]["cancelled"], true);

        let (status, json) =
            send(&app, "POST", "/api/appointments", Some(&p2), Some(booking(&doctor_id))).await;
        assert_eq!(status, StatusCode::OK);
        let second = json["appointment"]["id"].as_str().unwrap().to_string();

        let (_, json) = send(&app, "GET", &format!("/api/doctors/{doctor_id}/slots"), None, None).await;
        assert_eq!(json["slotsBooked"]["2025-03-01"], json!(["10:00 AM"]));

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/appointments/{second}/complete"),
            Some(&doctor_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/appointments/{second}/pay"),
            Some(&p2),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) =
            send(&app, "GET", "/api/doctor/dashboard", Some(&doctor_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["dashData"]["earnings"], 500.0);
        assert_eq!(json["dashData"]["patients"], 2);
        assert_eq!(json["dashData"]["appointments"], 2);
        assert_eq!(json["dashData"]["latestAppointments"][0]["id"], second.as_str());

        let (_, json) = send(&app, "GET", "/api/admin/dashboard", Some(ADMIN), None).await;
        assert_eq!(json["dashData"]["doctors"], 1);
        assert_eq!(json["dashData"]["patients"], 2);

        let (_, json) = send(&app, "GET", "/api/appointments", Some(&p1), None).await;
        assert_eq!(json["appointments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancelling_completed_is_conflict() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let (doctor_id, doctor_token) = add_doctor(&app, "d2@clinic.example", 100.0).await;
        let p = register(&app, "p3@example.com").await;
        let (_, json) =
            send(&app, "POST", "/api/appointments", Some(&p), Some(booking(&doctor_id))).await;
        let id = json["appointment"]["id"].as_str().unwrap().to_string();

        send(&app, "POST", &format!("/api/appointments/{id}/complete"), Some(&doctor_token), None).await;
        let (status, json) =
            send(&app, "POST", &format!("/api/appointments/{id}/cancel"), Some(&p), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "INVALID_STATE_TRANSITION");
    }

    #[tokio::test]
    async fn roles_are_enforced_per_route() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let p = register(&app, "p4@example.com").await;

        let (status, json) = send(&app, "GET", "/api/admin/dashboard", Some(&p), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["success"], false);

        let (status, _) = send(&app, "GET", "/api/doctor/dashboard", Some(&p), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_input_is_bad_request() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let p = register(&app, "p5@example.com").await;

        let (status, json) =
            send(&app, "POST", "/api/appointments/not-a-uuid/cancel", Some(&p), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");

        let (status, json) = send(
            &app,
            "POST",
            "/api/appointments",
            Some(&p),
            Some(json!({ "slotDate": "2025-03-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn admin_toggles_availability() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let (doctor_id, _) = add_doctor(&app, "d3@clinic.example", 100.0).await;
        let p = register(&app, "p6@example.com").await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/admin/availability",
            Some(ADMIN),
            Some(json!({ "doctorId": doctor_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["available"], false);

        let (status, json) =
            send(&app, "POST", "/api/appointments", Some(&p), Some(booking(&doctor_id))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "DOCTOR_UNAVAILABLE");
    }

    #[tokio::test]
    async fn vitals_round_trip() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let p = register(&app, "p7@example.com").await;
        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();

        let (status, json) = send(
            &app,
            "POST",
            "/api/vitals/glucose",
            Some(&p),
            Some(json!({ "value": 110, "context": "fasting", "date": today })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["reading"]["category"], "prediabetic");
        let id = json["reading"]["id"].as_str().unwrap().to_string();

        let (_, json) = send(&app, "GET", "/api/vitals/glucose", Some(&p), None).await;
        assert_eq!(json["readings"].as_array().unwrap().len(), 1);

        let (_, json) =
            send(&app, "GET", "/api/vitals/glucose/analytics?days=7", Some(&p), None).await;
        assert_eq!(json["analytics"]["totalReadings"], 1);

        let other = register(&app, "p8@example.com").await;
        let (status, _) =
            send(&app, "DELETE", &format!("/api/vitals/readings/{id}"), Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) =
            send(&app, "DELETE", &format!("/api/vitals/readings/{id}"), Some(&p), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", "/api/vitals/weight", Some(&p), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rate_limit_returns_429() {
        let (core, _tmp) = test_core();
        let ctx = ApiContext::with_limiter(core, RateLimiter::with_limits(2, 100));
        let app = api_router_with_ctx(ctx);

        for _ in 0..2 {
            let (status, _) = send(&app, "GET", "/api/doctors", None, None).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, json) = send(&app, "GET", "/api/doctors", None, None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["code"], "RATE_LIMITED");
    }

    async fn get_from(app: &Router, peer: &str, token: &str) -> StatusCode {
        let mut req = Request::builder()
            .uri("/api/doctors")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let addr: std::net::SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(axum::extract::ConnectInfo(addr));
        app.clone().oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn rate_limit_is_per_peer_and_ignores_tokens() {
        let (core, _tmp) = test_core();
        let ctx = ApiContext::with_limiter(core, RateLimiter::with_limits(3, 100));
        let app = api_router_with_ctx(ctx);

        for i in 0..3 {
            let status = get_from(&app, "203.0.113.7:40000", &format!("fake-{i}")).await;
            assert_eq!(status, StatusCode::OK);
        }
        let status = get_from(&app, "203.0.113.7:40001", "fake-fresh").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let status = get_from(&app, "198.51.100.2:40000", "fake-0").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn patient_updates_profile() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let p = register(&app, "p9@example.com").await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/patient/profile",
            Some(&p),
            Some(json!({ "name": "Renamed", "phone": "555-0100", "dateOfBirth": "1985-07-04" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["userData"]["name"], "Renamed");

        let (_, json) = send(&app, "GET", "/api/patient/profile", Some(&p), None).await;
        assert_eq!(json["userData"]["phone"], "555-0100");
        assert_eq!(json["userData"]["dateOfBirth"], "1985-07-04");

        let (status, _) = send(
            &app,
            "POST",
            "/api/patient/profile",
            Some(ADMIN),
            Some(json!({ "name": "Admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn glucose_trends_over_http() {
        let (core, _tmp) = test_core();
        let app = api_router(core);
        let p = register(&app, "p10@example.com").await;
        let today = chrono::Utc::now().date_naive();
        let yesterday = today - chrono::Duration::days(1);

        for (value, ctx, date, time) in [
            (180.0, "after_meal", today, "12:30"),
            (92.0, "fasting", today, "06:45"),
            (98.0, "fasting", yesterday, "07:00"),
        ] {
            let (status, json) = send(
                &app,
                "POST",
                "/api/vitals/glucose",
                Some(&p),
                Some(json!({
                    "value": value,
                    "context": ctx,
                    "date": date.format("%Y-%m-%d").to_string(),
                    "time": time
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{json}");
        }

        let (status, json) = send(&app, "GET", "/api/vitals/glucose/trends", Some(&p), None).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["totalReadings"], 3);
        let day = today.format("%Y-%m-%d").to_string();
        assert_eq!(json["trendData"][&day][0]["time"], "06:45");
        assert_eq!(json["trendData"][&day][1]["glucose"], 180.0);

        let (_, json) = send(
            &app,
            "GET",
            "/api/vitals/glucose/trends?days=3&readingType=fasting",
            Some(&p),
            None,
        )
        .await;
        assert_eq!(json["totalReadings"], 2);

        let (status, _) =
            send(&app, "GET", "/api/vitals/glucose/trends?readingType=lunch", Some(&p), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, "GET", "/api/vitals/pulse/trends", Some(&p), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn authenticated_requests_are_audited() {
        let (core, _tmp) = test_core();
        let app = api_router(core.clone());
        send(&app, "GET", "/api/admin/dashboard", Some(ADMIN), None).await;
        assert_eq!(core.audit_buffer_len(), 1);
    }
}
