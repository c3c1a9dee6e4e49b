use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use invite_portal::backend::InvitationBackend;
use invite_portal::workflows::admin::{admin_router, AdminService};
use invite_portal::workflows::intake::{intake_router, IntakeService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_portal_routes<B>(
    intake: Arc<IntakeService<B>>,
    admin: Arc<AdminService<B>>,
) -> axum::Router
where
    B: InvitationBackend + 'static,
{
    intake_router(intake)
        .merge(admin_router(admin))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use invite_portal::backend::HttpBackend;
    use invite_portal::clock::{Clock, SystemClock};
    use invite_portal::config::{BackendConfig, IntakeConfig};
    use invite_portal::workflows::intake::InMemorySessionStore;
    use invite_portal::workflows::window::{SystemConfig, WindowGate};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tower::ServiceExt;

    fn portal(ready: bool) -> axum::Router {
        let backend =
            Arc::new(HttpBackend::new(&BackendConfig::default()).expect("client builds"));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let gate = Arc::new(WindowGate::spawn(
            SystemConfig::default(),
            Arc::clone(&clock),
            Duration::from_secs(1),
        ));
        let intake = Arc::new(IntakeService::new(
            Arc::clone(&backend),
            Arc::new(InMemorySessionStore::new()),
            Arc::clone(&gate),
            Arc::clone(&clock),
            IntakeConfig::default(),
        ));
        let admin = Arc::new(AdminService::new(backend, gate, clock));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_portal_routes(intake, admin).layer(Extension(state))
    }

    async fn get(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let (status, body) = get(portal(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "status": "initializing" }));

        let (status, _) = get(portal(true), "/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn portal_routes_are_mounted() {
        let (status, body) = get(portal(true), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));

        let (status, body) = get(portal(true), "/api/v1/window").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("open"), Some(&json!(false)));

        let (status, _) = get(portal(true), "/api/v1/admin/sessions/unknown/stats").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
