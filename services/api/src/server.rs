use crate::cli::ServeArgs;
use crate::infra::{
    admin_throttle, AppState, InMemoryAdminDirectory, InMemoryApplicationStore,
    InMemoryDecisionNotifier,
};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use sevis_portal::config::AppConfig;
use sevis_portal::error::AppError;
use sevis_portal::telemetry;
use sevis_portal::workflows::applications::PortalState;
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

    let store = Arc::new(InMemoryApplicationStore::default());
    let directory = Arc::new(InMemoryAdminDirectory::seed_demo_admins());
    let notifier = Arc::new(InMemoryDecisionNotifier::default());
    let throttle = Arc::new(admin_throttle(&config.admin_security));
    let portal = PortalState::new(store, directory, notifier, throttle);

    let app = with_portal_routes(portal)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "citizen services portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
