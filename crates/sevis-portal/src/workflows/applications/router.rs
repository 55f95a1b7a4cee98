use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::domain::{
    Application, ApplicationId, ApplicationSubmission, DeclaredDocument, DocumentKind, ServiceKind,
    VettingAssessment,
};
use super::intake::{ApplicationIntakeService, IntakeError};
use super::limits::LimitDecision;
use super::roles::{self, AdminUser};
use super::store::{AdminDirectory, ApplicationStore, DecisionNotifier, StoreError};
use super::throttle::AdminAttemptThrottle;
use super::workflow::{AdminWorkflowService, WorkflowError};

/// Shared state behind the portal's application endpoints.
pub struct PortalState<S, D, N> {
    intake: Arc<ApplicationIntakeService<S>>,
    workflow: Arc<AdminWorkflowService<S, N>>,
    directory: Arc<D>,
    store: Arc<S>,
    throttle: Arc<AdminAttemptThrottle>,
}

impl<S, D, N> Clone for PortalState<S, D, N> {
    fn clone(&self) -> Self {
        Self {
            intake: Arc::clone(&self.intake),
            workflow: Arc::clone(&self.workflow),
            directory: Arc::clone(&self.directory),
            store: Arc::clone(&self.store),
            throttle: Arc::clone(&self.throttle),
        }
    }
}

impl<S, D, N> PortalState<S, D, N>
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        notifier: Arc<N>,
        throttle: Arc<AdminAttemptThrottle>,
    ) -> Self {
        Self {
            intake: Arc::new(ApplicationIntakeService::new(Arc::clone(&store))),
            workflow: Arc::new(AdminWorkflowService::new(Arc::clone(&store), notifier)),
            directory,
            store,
            throttle,
        }
    }

    /// Looks up the acting admin, counting unknown identifiers as failures.
    fn resolve_admin(&self, admin_id: &str) -> Result<AdminUser, Response> {
        match self.directory.fetch_admin(admin_id) {
            Ok(Some(admin)) => Ok(admin),
            Ok(None) => {
                self.throttle.record_failure(admin_id);
                Err(action_failure(
                    StatusCode::FORBIDDEN,
                    format!("unknown admin: {admin_id}"),
                ))
            }
            Err(err) => Err(action_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
            )),
        }
    }

    /// Maps a workflow error to a response, counting authorization failures.
    fn workflow_failure(&self, admin_id: &str, err: WorkflowError) -> Response {
        if matches!(err, WorkflowError::NotAdmin { .. }) {
            self.throttle.record_failure(admin_id);
        }
        workflow_error_response(err)
    }

    fn throttled(&self, admin_id: &str) -> Option<Response> {
        if self.throttle.blocked(admin_id) {
            return Some(action_failure(
                StatusCode::TOO_MANY_REQUESTS,
                "too many failed admin actions; try again later".to_string(),
            ));
        }
        None
    }
}

/// Router builder exposing the citizen and admin application endpoints.
pub fn application_router<S, D, N>(state: PortalState<S, D, N>) -> Router
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<S, D, N>))
        .route(
            "/api/v1/applications/:application_id",
            get(application_status_handler::<S, D, N>),
        )
        .route(
            "/api/v1/users/:user_id/applications",
            get(user_applications_handler::<S, D, N>),
        )
        .route(
            "/api/v1/users/:user_id/eligibility/:service",
            get(eligibility_handler::<S, D, N>),
        )
        .route(
            "/api/v1/admin/applications/:application_id/vet",
            post(vet_handler::<S, D, N>),
        )
        .route(
            "/api/v1/admin/applications/:application_id/approve",
            post(approve_handler::<S, D, N>),
        )
        .route(
            "/api/v1/admin/applications/:application_id/reject",
            post(reject_handler::<S, D, N>),
        )
        .route(
            "/api/v1/admin/applications/:application_id/request-info",
            post(request_info_handler::<S, D, N>),
        )
        .route(
            "/api/v1/admin/applications/:application_id/documents",
            post(document_checks_handler::<S, D, N>),
        )
        .route(
            "/api/v1/admin/applications",
            delete(purge_handler::<S, D, N>),
        )
        .with_state(state)
}

/// Citizen submission body; the service arrives as its portal name.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub user_id: String,
    pub service_name: String,
    #[serde(default)]
    pub form: BTreeMap<String, String>,
    #[serde(default)]
    pub documents: Vec<DeclaredDocument>,
}

#[derive(Debug, Deserialize)]
pub struct VetRequest {
    pub admin_id: String,
    pub expected_service: String,
    #[serde(flatten)]
    pub assessment: VettingAssessment,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub admin_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub admin_id: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestInfoRequest {
    pub admin_id: String,
    pub details: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentChecksRequest {
    pub admin_id: String,
    pub completed: bool,
    #[serde(default)]
    pub verified: BTreeMap<DocumentKind, bool>,
}

#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub admin_id: String,
    pub delete_scope: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
}

/// Tally of a bulk purge, including per-application detail lines.
#[derive(Debug, Serialize)]
pub struct PurgeOutcome {
    pub deleted_count: usize,
    pub error_count: usize,
    pub details: Vec<String>,
}

pub(crate) async fn submit_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    if request.user_id.trim().is_empty() {
        return validation_error("user_id must not be empty".to_string());
    }
    let Some(service) = ServiceKind::from_name(&request.service_name) else {
        return validation_error(format!("unknown service: {}", request.service_name));
    };

    let submission = ApplicationSubmission {
        user_id: request.user_id.trim().to_string(),
        service,
        form: request.form,
        documents: request.documents,
    };
    match state.intake.submit(submission, Utc::now()) {
        Ok(application) => {
            (StatusCode::CREATED, axum::Json(application.status_view())).into_response()
        }
        Err(IntakeError::Denied(decision)) => {
            (StatusCode::CONFLICT, axum::Json(decision)).into_response()
        }
        Err(IntakeError::Store(err @ StoreError::OpenApplicationExists { .. })) => {
            action_failure(StatusCode::CONFLICT, err.to_string())
        }
        Err(IntakeError::Store(err)) => {
            action_failure(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub(crate) async fn application_status_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    let id = ApplicationId(application_id);
    match state.workflow.get(&id) {
        Ok(application) => {
            (StatusCode::OK, axum::Json(application.status_view())).into_response()
        }
        Err(WorkflowError::NotFound) => {
            action_failure(StatusCode::NOT_FOUND, "application not found".to_string())
        }
        Err(err) => action_failure(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub(crate) async fn user_applications_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    match state.store.for_user(&user_id) {
        Ok(applications) => {
            let views: Vec<_> = applications
                .iter()
                .map(|application| application.status_view())
                .collect();
            (
                StatusCode::OK,
                axum::Json(json!({ "user_id": user_id, "applications": views })),
            )
                .into_response()
        }
        Err(err) => action_failure(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub(crate) async fn eligibility_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    Path((user_id, service_name)): Path<(String, String)>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    let Some(service) = ServiceKind::from_name(&service_name) else {
        return validation_error(format!("unknown service: {service_name}"));
    };

    match state
        .intake
        .limits()
        .check_service_limits(&user_id, service, None)
    {
        Ok(decision) => (StatusCode::OK, axum::Json(decision)).into_response(),
        // Outages degrade to a canned denial so the portal UI keeps working.
        Err(err) => {
            warn!(user = %user_id, error = %err, "eligibility check hit a store failure");
            (StatusCode::OK, axum::Json(LimitDecision::store_failure())).into_response()
        }
    }
}

pub(crate) async fn vet_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<VetRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    if let Some(response) = state.throttled(&request.admin_id) {
        return response;
    }
    let Some(expected_service) = ServiceKind::from_name(&request.expected_service) else {
        return validation_error(format!("unknown service: {}", request.expected_service));
    };
    let admin = match state.resolve_admin(&request.admin_id) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    let id = ApplicationId(application_id);
    match state
        .workflow
        .vet(&id, &admin, expected_service, request.assessment, Utc::now())
    {
        Ok(application) => action_success(&application),
        Err(err) => state.workflow_failure(&request.admin_id, err),
    }
}

pub(crate) async fn approve_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ApproveRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    if let Some(response) = state.throttled(&request.admin_id) {
        return response;
    }
    let admin = match state.resolve_admin(&request.admin_id) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    let id = ApplicationId(application_id);
    match state.workflow.approve(&id, &admin, Utc::now()) {
        Ok(application) => action_success(&application),
        Err(err) => state.workflow_failure(&request.admin_id, err),
    }
}

pub(crate) async fn reject_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<RejectRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    if let Some(response) = state.throttled(&request.admin_id) {
        return response;
    }
    let admin = match state.resolve_admin(&request.admin_id) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    let id = ApplicationId(application_id);
    match state.workflow.reject(&id, &admin, &request.reason, Utc::now()) {
        Ok(application) => action_success(&application),
        Err(err) => state.workflow_failure(&request.admin_id, err),
    }
}

pub(crate) async fn request_info_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<RequestInfoRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    if let Some(response) = state.throttled(&request.admin_id) {
        return response;
    }
    let admin = match state.resolve_admin(&request.admin_id) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    let id = ApplicationId(application_id);
    match state
        .workflow
        .request_more_info(&id, &admin, &request.details, Utc::now())
    {
        Ok(application) => action_success(&application),
        Err(err) => state.workflow_failure(&request.admin_id, err),
    }
}

pub(crate) async fn document_checks_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<DocumentChecksRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    if let Some(response) = state.throttled(&request.admin_id) {
        return response;
    }
    let admin = match state.resolve_admin(&request.admin_id) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    let id = ApplicationId(application_id);
    match state.workflow.record_document_checks(
        &id,
        &admin,
        request.verified,
        request.completed,
        Utc::now(),
    ) {
        Ok(application) => action_success(&application),
        Err(err) => state.workflow_failure(&request.admin_id, err),
    }
}

pub(crate) async fn purge_handler<S, D, N>(
    State(state): State<PortalState<S, D, N>>,
    axum::Json(request): axum::Json<PurgeRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    D: AdminDirectory + 'static,
    N: DecisionNotifier + 'static,
{
    if let Some(response) = state.throttled(&request.admin_id) {
        return response;
    }
    let admin = match state.resolve_admin(&request.admin_id) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    if !roles::is_admin(&admin) {
        state.throttle.record_failure(&request.admin_id);
        return action_failure(
            StatusCode::FORBIDDEN,
            format!("{} does not hold an admin role", admin.id),
        );
    }

    let scope = request.delete_scope.trim();
    let targets = match scope {
        "user" => {
            let Some(user_id) = request
                .user_id
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
            else {
                return validation_error("delete_scope 'user' requires user_id".to_string());
            };
            match state.store.for_user(user_id) {
                Ok(applications) => applications,
                Err(err) => {
                    return action_failure(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            }
        }
        "service" => {
            let Some(service_name) = request.service_name.as_deref() else {
                return validation_error("delete_scope 'service' requires service_name".to_string());
            };
            let Some(service) = ServiceKind::from_name(service_name) else {
                return validation_error(format!("unknown service: {service_name}"));
            };
            match state.store.all() {
                Ok(applications) => applications
                    .into_iter()
                    .filter(|application| application.service == service)
                    .collect(),
                Err(err) => {
                    return action_failure(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            }
        }
        "all" => {
            if !roles::is_super_admin(&admin) {
                state.throttle.record_failure(&request.admin_id);
                return action_failure(
                    StatusCode::FORBIDDEN,
                    "purging all applications requires the super_admin level".to_string(),
                );
            }
            match state.store.all() {
                Ok(applications) => applications,
                Err(err) => {
                    return action_failure(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            }
        }
        other => {
            return validation_error(format!(
                "delete_scope must be 'user', 'service', or 'all' (got '{other}')"
            ));
        }
    };

    let mut outcome = PurgeOutcome {
        deleted_count: 0,
        error_count: 0,
        details: Vec::new(),
    };
    for application in targets {
        match state.store.delete(&application.id) {
            Ok(()) => {
                outcome.deleted_count += 1;
                outcome.details.push(format!("deleted {}", application.id));
            }
            Err(err) => {
                outcome.error_count += 1;
                outcome
                    .details
                    .push(format!("failed {}: {err}", application.id));
            }
        }
    }
    info!(
        admin = %admin.id,
        scope,
        deleted = outcome.deleted_count,
        errors = outcome.error_count,
        "bulk purge completed"
    );
    (
        StatusCode::OK,
        axum::Json(json!({ "success": true, "data": outcome })),
    )
        .into_response()
}

fn action_success(application: &Application) -> Response {
    (
        StatusCode::OK,
        axum::Json(json!({ "success": true, "data": application.status_view() })),
    )
        .into_response()
}

fn action_failure(status: StatusCode, error: String) -> Response {
    (
        status,
        axum::Json(json!({ "success": false, "error": error })),
    )
        .into_response()
}

fn validation_error(error: String) -> Response {
    action_failure(StatusCode::UNPROCESSABLE_ENTITY, error)
}

fn workflow_error_response(err: WorkflowError) -> Response {
    let status = match &err {
        WorkflowError::NotFound | WorkflowError::Store(StoreError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        WorkflowError::NotAdmin { .. } => StatusCode::FORBIDDEN,
        WorkflowError::NotPermitted { .. }
        | WorkflowError::NotVetted
        | WorkflowError::VettingDidNotRecommend { .. }
        | WorkflowError::Store(StoreError::OpenApplicationExists { .. })
        | WorkflowError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        WorkflowError::ServiceMismatch { .. } | WorkflowError::MissingReason => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::Store(StoreError::Unavailable(_)) | WorkflowError::Notify(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    action_failure(status, err.to_string())
}
