use crate::cli::ServeArgs;
use crate::infra::{build_ppm_service, AppState};
use crate::routes::with_ppm_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ppm_shipments::config::AppConfig;
use ppm_shipments::error::AppError;
use ppm_shipments::telemetry;
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

    let (service, _store) = build_ppm_service(&config.ppm);
    let app = with_ppm_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        advance_cap_percent = config.ppm.advance_cap_percent,
        "ppm shipment service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
