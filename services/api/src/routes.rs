use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use saudapakka::accounts::{
    KycError, KycService, OtpAuthenticator, OtpError, User, UserDirectory, UserId,
};
use saudapakka::listings::{ListingError, ListingService, PropertyId};
use saudapakka::mandates::{mandate_router, MandateService};

use crate::infra::{
    AppState, InMemoryKycRepository, InMemoryListingRepository, InMemoryMandateRepository,
    InMemoryOtpStore, InMemoryUserDirectory, RecordingNotificationSink, StaticKycProvider,
};

/// Concrete service wiring shared by the auth and admin endpoints.
#[derive(Clone)]
pub(crate) struct ApiContext {
    pub(crate) directory: Arc<InMemoryUserDirectory>,
    pub(crate) otp: Arc<OtpAuthenticator<InMemoryOtpStore>>,
    pub(crate) kyc:
        Arc<KycService<StaticKycProvider, InMemoryKycRepository, InMemoryUserDirectory>>,
    pub(crate) listings: Arc<ListingService<InMemoryListingRepository>>,
}

pub(crate) fn build_router(
    context: ApiContext,
    mandates: Arc<
        MandateService<InMemoryMandateRepository, InMemoryUserDirectory, RecordingNotificationSink>,
    >,
) -> axum::Router {
    mandate_router(mandates).merge(
        axum::Router::new()
            .route("/health", axum::routing::get(healthcheck))
            .route("/ready", axum::routing::get(readiness_endpoint))
            .route("/metrics", axum::routing::get(metrics_endpoint))
            .route(
                "/api/v1/auth/otp/request",
                axum::routing::post(otp_request_endpoint),
            )
            .route(
                "/api/v1/auth/otp/verify",
                axum::routing::post(otp_verify_endpoint),
            )
            .route(
                "/api/v1/admin/kyc/:user_id/verify",
                axum::routing::post(kyc_override_endpoint),
            )
            .route(
                "/api/v1/admin/properties/:property_id/action",
                axum::routing::post(listing_action_endpoint),
            )
            .route("/api/v1/admin/users", axum::routing::get(users_endpoint))
            .with_state(context),
    )
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

#[derive(Debug, Deserialize)]
pub(crate) struct OtpRequestBody {
    email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OtpVerifyBody {
    email: String,
    code: String,
}

#[derive(Debug, Serialize)]
struct AccountView {
    id: UserId,
    email: String,
    full_name: String,
    role: &'static str,
    kyc_verified: bool,
}

impl From<&User> for AccountView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.label(),
            kyc_verified: user.kyc_verified,
        }
    }
}

pub(crate) async fn otp_request_endpoint(
    State(context): State<ApiContext>,
    Json(body): Json<OtpRequestBody>,
) -> Response {
    let account = match context.directory.find_by_email(&body.email) {
        Ok(Some(account)) => account,
        Ok(None) => return error(StatusCode::NOT_FOUND, "no account for this email"),
        Err(err) => return error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    };

    match context.otp.issue(&account.email, Utc::now()) {
        Ok(challenge) => {
            // Delivery (email/SMS) is an external collaborator; the code is
            // only logged here so operators can fish it out during testing.
            tracing::info!(email = %challenge.email, code = %challenge.code, "login code issued");
            (StatusCode::ACCEPTED, Json(json!({ "status": "sent" }))).into_response()
        }
        Err(err) => error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

pub(crate) async fn otp_verify_endpoint(
    State(context): State<ApiContext>,
    Json(body): Json<OtpVerifyBody>,
) -> Response {
    if let Err(err) = context.otp.verify(&body.email, &body.code, Utc::now()) {
        let status = match err {
            OtpError::Unknown => StatusCode::NOT_FOUND,
            OtpError::Expired | OtpError::Mismatch => StatusCode::UNAUTHORIZED,
            OtpError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        return error(status, &err.to_string());
    }

    match context.directory.find_by_email(&body.email) {
        Ok(Some(account)) => {
            (StatusCode::OK, Json(AccountView::from(&account))).into_response()
        }
        Ok(None) => error(StatusCode::NOT_FOUND, "no account for this email"),
        Err(err) => error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

pub(crate) async fn kyc_override_endpoint(
    State(context): State<ApiContext>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Response {
    let actor = match actor(&headers, context.directory.as_ref()) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match context
        .kyc
        .admin_override(&actor, &UserId(user_id), Utc::now())
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => {
            let status = match err {
                KycError::AdminOnly => StatusCode::FORBIDDEN,
                KycError::UnknownUser => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error(status, &err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub(crate) enum ListingAction {
    Approve,
    Reject { reason: String },
}

pub(crate) async fn listing_action_endpoint(
    State(context): State<ApiContext>,
    headers: HeaderMap,
    Path(property_id): Path<Uuid>,
    Json(action): Json<ListingAction>,
) -> Response {
    let actor = match actor(&headers, context.directory.as_ref()) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let id = PropertyId(property_id);
    let result = match action {
        ListingAction::Approve => context.listings.approve(&actor, &id),
        ListingAction::Reject { reason } => context.listings.reject(&actor, &id, reason),
    };

    match result {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => {
            let status = match err {
                ListingError::AdminOnly | ListingError::NotASeller => StatusCode::FORBIDDEN,
                ListingError::NotFound => StatusCode::NOT_FOUND,
                ListingError::EmptyTitle => StatusCode::UNPROCESSABLE_ENTITY,
                ListingError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error(status, &err.to_string())
        }
    }
}

pub(crate) async fn users_endpoint(
    State(context): State<ApiContext>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor(&headers, context.directory.as_ref()) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    if !actor.role.is_admin() {
        return error(StatusCode::FORBIDDEN, "administrator access required");
    }

    match context.directory.users() {
        Ok(users) => {
            let views: Vec<AccountView> = users.iter().map(AccountView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

fn actor(headers: &HeaderMap, directory: &InMemoryUserDirectory) -> Result<User, Response> {
    let raw = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "x-user-id header is required"))?;
    let id = raw
        .parse::<Uuid>()
        .map_err(|_| error(StatusCode::UNAUTHORIZED, "x-user-id header must be a UUID"))?;

    match directory.fetch(&UserId(id)) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(error(StatusCode::UNAUTHORIZED, "unknown account")),
        Err(err) => Err(error(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())),
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryOtpStore, InMemoryUserDirectory};
    use saudapakka::accounts::UserRole;
    use tower::ServiceExt;

    fn account(role: UserRole) -> User {
        User {
            id: UserId::new(),
            email: format!("{}@example.in", role.label()),
            phone_number: None,
            full_name: "Test Account".to_string(),
            role,
            kyc_verified: false,
        }
    }

    fn context() -> (ApiContext, Arc<InMemoryUserDirectory>) {
        let directory = Arc::new(InMemoryUserDirectory::default());
        let context = ApiContext {
            directory: directory.clone(),
            otp: Arc::new(OtpAuthenticator::new(
                Arc::new(InMemoryOtpStore::default()),
                10,
            )),
            kyc: Arc::new(KycService::new(
                Arc::new(StaticKycProvider),
                Arc::new(InMemoryKycRepository::default()),
                directory.clone(),
            )),
            listings: Arc::new(ListingService::new(Arc::new(
                InMemoryListingRepository::default(),
            ))),
        };
        (context, directory)
    }

    fn router(context: ApiContext) -> axum::Router {
        let directory = context.directory.clone();
        build_router(
            context,
            Arc::new(MandateService::new(
                Arc::new(InMemoryMandateRepository::default()),
                directory,
                Arc::new(RecordingNotificationSink::default()),
            )),
        )
    }

    #[tokio::test]
    async fn otp_request_for_unknown_email_is_not_found() {
        let (context, _) = context();
        let app = router(context);

        let response = app
            .oneshot(
                axum::http::Request::post("/api/v1/auth/otp/request")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(axum::body::Body::from(
                        serde_json::to_vec(&json!({ "email": "nobody@example.in" })).unwrap(),
                    ))
                    .unwrap(),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn kyc_override_requires_admin_actor() {
        let (context, directory) = context();
        let admin = account(UserRole::Admin);
        let seller = account(UserRole::Seller);
        directory.seed(admin.clone());
        directory.seed(seller.clone());
        let app = router(context);

        let denied = app
            .clone()
            .oneshot(
                axum::http::Request::post(format!("/api/v1/admin/kyc/{}/verify", seller.id.0))
                    .header("x-user-id", seller.id.0.to_string())
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let verified = app
            .oneshot(
                axum::http::Request::post(format!("/api/v1/admin/kyc/{}/verify", seller.id.0))
                    .header("x-user-id", admin.id.0.to_string())
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(verified.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn user_listing_is_admin_only() {
        let (context, directory) = context();
        let admin = account(UserRole::Admin);
        let broker = account(UserRole::Broker);
        directory.seed(admin.clone());
        directory.seed(broker.clone());
        let app = router(context);

        let denied = app
            .clone()
            .oneshot(
                axum::http::Request::get("/api/v1/admin/users")
                    .header("x-user-id", broker.id.0.to_string())
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let allowed = app
            .oneshot(
                axum::http::Request::get("/api/v1/admin/users")
                    .header("x-user-id", admin.id.0.to_string())
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(allowed.status(), StatusCode::OK);
    }
}
