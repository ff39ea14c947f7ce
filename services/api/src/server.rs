use crate::cli::ServeArgs;
use crate::infra::{
    load_reference_data, AppState, InMemoryComplianceRepository, InMemoryNotifications,
};
use crate::routes::with_compliance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use grc_engine::config::AppConfig;
use grc_engine::error::AppError;
use grc_engine::telemetry;
use grc_engine::workflows::compliance::assessments::{AssessmentService, OnboardingOrchestrator};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let (catalog, rules) = load_reference_data(&config.reference)?;
    let repository = Arc::new(InMemoryComplianceRepository::default());
    let notifications = Arc::new(InMemoryNotifications::default());
    let onboarding = Arc::new(OnboardingOrchestrator::new(
        Arc::new(catalog),
        Arc::new(rules),
        repository.clone(),
        notifications.clone(),
    ));
    let assessments = Arc::new(AssessmentService::new(repository, notifications));

    let app = with_compliance_routes(onboarding, assessments)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "grc assessment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
