use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::arrears_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tenant_arrears::config::AppConfig;
use tenant_arrears::error::AppError;
use tenant_arrears::telemetry;
use tenant_arrears::workflows::arrears::ArrearsReportGenerator;
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        generator: Arc::new(ArrearsReportGenerator::new(&config.report)),
    };

    let app = arrears_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        resident_sheet = %config.report.resident_sheet,
        "arrears report service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
