use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::captcha::CaptchaError;
use super::domain::{ContactDetails, ScoreData, SessionId};
use super::form::FormError;
use super::service::{IntakeError, IntakeService};
use crate::backend::InvitationBackend;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub captcha: String,
}

/// Applicant-facing endpoints.
pub fn intake_router<B>(service: Arc<IntakeService<B>>) -> Router
where
    B: InvitationBackend + 'static,
{
    Router::new()
        .route("/api/v1/intake/sessions", post(start_handler::<B>))
        .route(
            "/api/v1/intake/sessions/:session_id",
            get(view_handler::<B>).delete(reset_handler::<B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/contact",
            put(contact_handler::<B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/advance",
            post(advance_handler::<B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/back",
            post(back_handler::<B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/scores",
            put(scores_handler::<B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/captcha",
            get(captcha_handler::<B>).post(captcha_refresh_handler::<B>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/submit",
            post(submit_handler::<B>),
        )
        .route("/api/v1/window", get(window_handler::<B>))
        .with_state(service)
}

pub(crate) async fn start_handler<B>(State(service): State<Arc<IntakeService<B>>>) -> Response
where
    B: InvitationBackend + 'static,
{
    match service.start_session().await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn view_handler<B>(
    State(service): State<Arc<IntakeService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.view_session(&SessionId(session_id)).await)
}

pub(crate) async fn contact_handler<B>(
    State(service): State<Arc<IntakeService<B>>>,
    Path(session_id): Path<String>,
    Json(details): Json<ContactDetails>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.set_contact(&SessionId(session_id), details).await)
}

pub(crate) async fn advance_handler<B>(
    State(service): State<Arc<IntakeService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.advance(&SessionId(session_id)).await)
}

pub(crate) async fn back_handler<B>(
    State(service): State<Arc<IntakeService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.back(&SessionId(session_id)).await)
}

pub(crate) async fn scores_handler<B>(
    State(service): State<Arc<IntakeService<B>>>,
    Path(session_id): Path<String>,
    Json(scores): Json<ScoreData>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    respond(service.update_scores(&SessionId(session_id), scores).await)
}

pub(crate) async fn captcha_handler<B>(
    State(service): State<Arc<IntakeService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    png_response(service.captcha_png(&SessionId(session_id), false).await)
}

pub(crate) async fn captcha_refresh_handler<B>(
    State(service): State<Arc<IntakeService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    png_response(service.captcha_png(&SessionId(session_id), true).await)
}

pub(crate) async fn submit_handler<B>(
    State(service): State<Arc<IntakeService<B>>>,
    Path(session_id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    match service
        .submit(&SessionId(session_id), &request.captcha)
        .await
    {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn reset_handler<B>(
    State(service): State<Arc<IntakeService<B>>>,
    Path(session_id): Path<String>,
) -> Response
where
    B: InvitationBackend + 'static,
{
    match service.reset(&SessionId(session_id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) async fn window_handler<B>(State(service): State<Arc<IntakeService<B>>>) -> Response
where
    B: InvitationBackend + 'static,
{
    (StatusCode::OK, Json(service.window_status())).into_response()
}

fn respond<T: serde::Serialize>(outcome: Result<T, IntakeError>) -> Response {
    match outcome {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => intake_error_response(error),
    }
}

fn png_response(outcome: Result<Vec<u8>, IntakeError>) -> Response {
    match outcome {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            bytes,
        )
            .into_response(),
        Err(error) => intake_error_response(error),
    }
}

pub(crate) fn intake_error_response(error: IntakeError) -> Response {
    let message = error.to_string();
    let (status, payload) = match error {
        IntakeError::SessionNotFound => (StatusCode::NOT_FOUND, json!({ "error": message })),
        IntakeError::Form(FormError::Captcha(CaptchaError::Mismatch)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": message, "refreshed": true }),
        ),
        IntakeError::Form(FormError::MissingFields(fields)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": message, "fields": fields }),
        ),
        IntakeError::Form(FormError::MissingScores(fields)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": message, "fields": fields }),
        ),
        IntakeError::Form(
            FormError::WrongStep(_) | FormError::ScoreEntryClosed | FormError::Captcha(_),
        ) => (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": message })),
        IntakeError::AlreadyIssued => (StatusCode::CONFLICT, json!({ "error": message })),
        IntakeError::Issuance {
            fallback_form_url, ..
        } => (
            StatusCode::BAD_GATEWAY,
            json!({ "error": message, "fallback_form": fallback_form_url }),
        ),
        IntakeError::Form(FormError::Store(_)) | IntakeError::Captcha(_) => {
            tracing::error!(error = %message, "intake request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": message }),
            )
        }
    };
    (status, Json(payload)).into_response()
}
