use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::SortKey;
use super::service::{AdminError, AdminService};
use super::viewer::RecordQuery;
use crate::backend::InvitationBackend;
use crate::workflows::intake::domain::SessionId;
use crate::workflows::window::SystemConfig;

/// Shown for any backend failure other than a rejected password.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "connection failed or the system is unavailable, please try again later";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// Operator console endpoints.
pub fn admin_router<B>(service: Arc<AdminService<B>>) -> Router
where
    B: InvitationBackend + 'static,
{
    Router::new()
        .route("/api/v1/admin/sessions", post(login_handler::<B>))
        .route(
            "/api/v1/admin/sessions/:session_id",
            delete(logout_handler::<B>),
        )
        .route(
            "/api/v1/admin/sessions/:session_id/refresh",
            post(refresh_handler::<B>),
        )
        .route(
            "/api/v1/admin/sessions/:session_id/records",
            get(records_handler::<B>),
        )
        .route(
            "/api/v1/admin/sessions/:session_id/records/:record_id/toggle",
            post(toggle_status_handler::<B>),
        )
        .route(
            "/api/v1/admin/sessions/:session_id/sort/:key",
            post(sort_handler::<B>),
        )
        .route(
            "/api/v1/admin/sessions/:session_id/stats",
            get(stats_handler::<B>),
        )
        .route(
            "/api/v1/admin/sessions/:session_id/export",
            get(export_handler::<B>),
        )
        .route(
            "/api/v1/admin/sessions/:session_id/config",
            put(config_handler::<B>),
        )
        .route(
            "/api/v1/admin/sessions/:session_id/window",
            get(window_handler::<B>),
        )
        .with_state(service)
}

pub(crate) async fn login_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Json(request): Json<LoginRequest>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    match service.login(&request.password).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn logout_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    match service.logout(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn refresh_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.refresh(&SessionId(session_id)).await)
}

pub(crate) async fn records_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Path(session_id): Path<String>,
    Query(query): Query<RecordQuery>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.records(&SessionId(session_id), &query).await)
}

pub(crate) async fn toggle_status_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Path((session_id, record_id)): Path<(String, String)>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(
        service
            .toggle_status(&SessionId(session_id), &record_id)
            .await,
    )
}

pub(crate) async fn sort_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Path((session_id, key)): Path<(String, SortKey)>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.toggle_sort(&SessionId(session_id), key).await)
}

pub(crate) async fn stats_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.stats(&SessionId(session_id)).await)
}

pub(crate) async fn export_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    match service.export_csv(&SessionId(session_id)).await {
        Ok(file) => (
            StatusCode::OK,
            [
                (
                    header::CONTENT_TYPE,
                    "text/csv; charset=utf-8".to_string(),
                ),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.filename),
                ),
            ],
            file.bytes,
        )
            .into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) async fn config_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Path(session_id): Path<String>,
    Json(config): Json<SystemConfig>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.update_config(&SessionId(session_id), config).await)
}

pub(crate) async fn window_handler<B>(
    State(service): State<Arc<AdminService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.window_status(&SessionId(session_id)).await)
}

fn respond<T: serde::Serialize>(outcome: Result<T, AdminError>) -> Response {
    match outcome {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(error) => admin_error_response(error),
    }
}

pub(crate) fn admin_error_response(error: AdminError) -> Response {
    let (status, message) = match &error {
        AdminError::SessionNotFound | AdminError::RecordNotFound(_) => {
            (StatusCode::NOT_FOUND, error.to_string())
        }
        AdminError::AuthFailed => (StatusCode::UNAUTHORIZED, error.to_string()),
        AdminError::Backend(source) => {
            tracing::warn!(error = %source, "admin backend call failed");
            (StatusCode::BAD_GATEWAY, GENERIC_FAILURE_MESSAGE.to_string())
        }
        AdminError::Export(source) => {
            tracing::error!(error = %source, "csv export failed");
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    };
    (status, Json(json!({ "error": message }))).into_response()
}
