use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use saudapakka::accounts::{KycService, OtpAuthenticator, User, UserId, UserRole};
use saudapakka::config::AppConfig;
use saudapakka::error::AppError;
use saudapakka::listings::ListingService;
use saudapakka::mandates::MandateService;
use saudapakka::telemetry;

use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryKycRepository, InMemoryListingRepository, InMemoryMandateRepository,
    InMemoryOtpStore, InMemoryUserDirectory, RecordingNotificationSink, StaticKycProvider,
};
use crate::routes::{build_router, ApiContext};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = Arc::new(InMemoryUserDirectory::default());
    bootstrap_admin(&directory);

    let mandates = Arc::new(MandateService::new(
        Arc::new(InMemoryMandateRepository::default()),
        directory.clone(),
        Arc::new(RecordingNotificationSink::default()),
    ));
    let context = ApiContext {
        directory: directory.clone(),
        otp: Arc::new(OtpAuthenticator::new(
            Arc::new(InMemoryOtpStore::default()),
            config.auth.otp_ttl_minutes,
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

    let app = build_router(context, mandates)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "marketplace service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// The in-memory directory starts empty, so every boot seeds one
/// administrator and logs its id for use in the `x-user-id` header.
fn bootstrap_admin(directory: &InMemoryUserDirectory) {
    let admin = User {
        id: UserId::new(),
        email: "admin@saudapakka.in".to_string(),
        phone_number: None,
        full_name: "Platform Admin".to_string(),
        role: UserRole::Admin,
        kyc_verified: true,
    };
    info!(admin_id = %admin.id.0, email = %admin.email, "bootstrap administrator seeded");
    directory.seed(admin);
}
