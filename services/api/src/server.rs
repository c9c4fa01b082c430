use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryReviewNotifier, InMemoryVisaRepository};
use crate::routes::with_visa_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use visa_track::config::AppConfig;
use visa_track::error::AppError;
use visa_track::telemetry;
use visa_track::workflows::visa::{DocumentPolicy, VisaDocumentService};

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

    let repository = Arc::new(InMemoryVisaRepository::default());
    let notifier = Arc::new(InMemoryReviewNotifier::default());
    let policy = DocumentPolicy::from(&config.onboarding);
    let service = Arc::new(VisaDocumentService::new(repository, notifier, policy));

    let app = with_visa_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "visa onboarding tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}
