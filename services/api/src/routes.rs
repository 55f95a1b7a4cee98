use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use sevis_portal::workflows::applications::{
    application_router, AdminDirectory, ApplicationStore, DecisionNotifier, PortalState,
    ServiceKind,
};

#[derive(Debug, Serialize)]
pub(crate) struct ServiceCatalogueEntry {
    pub(crate) name: &'static str,
    pub(crate) token: &'static str,
    pub(crate) reference_prefix: &'static str,
}

pub(crate) fn service_catalogue() -> Vec<ServiceCatalogueEntry> {
    ServiceKind::catalogue()
        .into_iter()
        .map(|service| ServiceCatalogueEntry {
            name: service.label(),
            token: service.token(),
            reference_prefix: service.reference_prefix(),
        })
        .collect()
}

pub(crate) fn with_portal_routes<S, D, N>(state: PortalState<S, D, N>) -> axum::Router
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    application_router(state)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/services", axum::routing::get(services_endpoint))
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

/// Lists the services citizens can apply for, with the reference prefix each
/// approval will carry.
pub(crate) async fn services_endpoint() -> Json<serde_json::Value> {
    Json(json!({ "services": service_catalogue() }))
}
