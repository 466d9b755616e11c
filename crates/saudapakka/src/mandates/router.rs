use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::accounts::{UserDirectory, UserId};
use crate::notifications::NotificationSink;

use super::domain::{MandateDraft, MandateId, SignaturePacket};
use super::repository::MandateRepository;
use super::service::{MandateError, MandateService};

/// Router builder exposing the mandate lifecycle over HTTP.
///
/// Authentication is an upstream collaborator; the resolved account id
/// arrives in the `x-user-id` header and is passed into every operation
/// explicitly.
pub fn mandate_router<R, D, N>(service: Arc<MandateService<R, D, N>>) -> Router
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/mandates",
            post(create_handler::<R, D, N>).get(list_handler::<R, D, N>),
        )
        .route("/api/v1/mandates/:mandate_id", get(get_handler::<R, D, N>))
        .route(
            "/api/v1/mandates/:mandate_id/accept",
            post(accept_handler::<R, D, N>),
        )
        .route(
            "/api/v1/mandates/:mandate_id/reject",
            post(reject_handler::<R, D, N>),
        )
        .route(
            "/api/v1/mandates/:mandate_id/cancel",
            post(cancel_handler::<R, D, N>),
        )
        .route(
            "/api/v1/mandates/:mandate_id/renew",
            post(renew_handler::<R, D, N>),
        )
        .route(
            "/api/v1/mandates/:mandate_id/letter",
            get(letter_handler::<R, D, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    reason: String,
}

fn actor_from_headers(headers: &HeaderMap) -> Result<UserId, Response> {
    let raw = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| unauthorized("x-user-id header is required"))?;

    let id = raw
        .parse::<Uuid>()
        .map_err(|_| unauthorized("x-user-id header must be a UUID"))?;
    Ok(UserId(id))
}

fn unauthorized(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn error_response(error: MandateError) -> Response {
    let status = match &error {
        MandateError::MissingAttachment { .. }
        | MandateError::MissingCounterparty(_)
        | MandateError::PlatformDealNamesBroker
        | MandateError::PlatformDealNeedsSeller
        | MandateError::RoleCannotInitiate { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MandateError::KycRequired | MandateError::NotAParty | MandateError::AdminOnly => {
            StatusCode::FORBIDDEN
        }
        MandateError::NotPending { .. }
        | MandateError::AlreadySigned { .. }
        | MandateError::AcceptanceWindowClosed { .. }
        | MandateError::AlreadyClosed { .. }
        | MandateError::NotRenewable { .. }
        | MandateError::PropertyConflict => StatusCode::CONFLICT,
        MandateError::NotFound | MandateError::UnknownUser => StatusCode::NOT_FOUND,
        MandateError::Repository(_) | MandateError::Directory(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

async fn create_handler<R, D, N>(
    State(service): State<Arc<MandateService<R, D, N>>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<MandateDraft>,
) -> Response
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let now = Utc::now();
    match service.create(&actor, draft, now) {
        Ok(mandate) => {
            let view = mandate.view(now.date_naive());
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn list_handler<R, D, N>(
    State(service): State<Arc<MandateService<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let today = Utc::now().date_naive();
    match service.list_for(&actor) {
        Ok(mandates) => {
            let views: Vec<_> = mandates.iter().map(|mandate| mandate.view(today)).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn get_handler<R, D, N>(
    State(service): State<Arc<MandateService<R, D, N>>>,
    headers: HeaderMap,
    Path(mandate_id): Path<Uuid>,
) -> Response
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.get(&actor, &MandateId(mandate_id)) {
        Ok(mandate) => {
            let view = mandate.view(Utc::now().date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn accept_handler<R, D, N>(
    State(service): State<Arc<MandateService<R, D, N>>>,
    headers: HeaderMap,
    Path(mandate_id): Path<Uuid>,
    axum::Json(packet): axum::Json<SignaturePacket>,
) -> Response
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let now = Utc::now();
    match service.accept_and_sign(&actor, &MandateId(mandate_id), packet, now) {
        Ok(mandate) => {
            let view = mandate.view(now.date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn reject_handler<R, D, N>(
    State(service): State<Arc<MandateService<R, D, N>>>,
    headers: HeaderMap,
    Path(mandate_id): Path<Uuid>,
    axum::Json(request): axum::Json<RejectRequest>,
) -> Response
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let now = Utc::now();
    match service.reject(&actor, &MandateId(mandate_id), request.reason, now) {
        Ok(mandate) => {
            let view = mandate.view(now.date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn cancel_handler<R, D, N>(
    State(service): State<Arc<MandateService<R, D, N>>>,
    headers: HeaderMap,
    Path(mandate_id): Path<Uuid>,
) -> Response
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let now = Utc::now();
    match service.cancel(&actor, &MandateId(mandate_id), now) {
        Ok(mandate) => {
            let view = mandate.view(now.date_naive());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn renew_handler<R, D, N>(
    State(service): State<Arc<MandateService<R, D, N>>>,
    headers: HeaderMap,
    Path(mandate_id): Path<Uuid>,
    axum::Json(packet): axum::Json<SignaturePacket>,
) -> Response
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let now = Utc::now();
    match service.renew(&actor, &MandateId(mandate_id), packet, now) {
        Ok(mandate) => {
            let view = mandate.view(now.date_naive());
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn letter_handler<R, D, N>(
    State(service): State<Arc<MandateService<R, D, N>>>,
    headers: HeaderMap,
    Path(mandate_id): Path<Uuid>,
) -> Response
where
    R: MandateRepository + 'static,
    D: UserDirectory + 'static,
    N: NotificationSink + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.letter(&actor, &MandateId(mandate_id), Utc::now()) {
        Ok(letter) => (StatusCode::OK, axum::Json(letter)).into_response(),
        Err(error) => error_response(error),
    }
}
