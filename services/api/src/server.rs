use crate::cli::ServeArgs;
use crate::infra::{in_memory_collaborators, AppState, InMemoryCampStorage};
use crate::routes::with_camp_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use camp_eval::config::AppConfig;
use camp_eval::error::AppError;
use camp_eval::telemetry;
use camp_eval::workflows::camp::CampService;
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

    let storage = InMemoryCampStorage::default();
    let camp_service = Arc::new(CampService::new(
        &config.engine,
        in_memory_collaborators(&storage),
    ));

    let app = with_camp_routes(camp_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        score_min = config.engine.scale.min,
        score_max = config.engine.scale.max,
        "camp evaluation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
