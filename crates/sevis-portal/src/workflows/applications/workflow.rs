use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use tracing::info;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApprovalInfo, Decision, DocumentChecklist,
    DocumentKind, InfoRequest, InfoRequestStatus, ProcessingStage, RecommendedAction,
    RejectionInfo, ServiceKind, VettingAssessment,
};
use super::reference::ReferenceNumber;
use super::roles::{self, AdminAction, AdminUser};
use super::store::{
    ApplicationPatch, ApplicationStore, DecisionNotice, DecisionNotifier, NotifyError, StoreError,
};

/// How long an approved credential stays valid.
const VALIDITY_MONTHS: u32 = 24;

/// Error raised by the admin workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("application not found")]
    NotFound,
    #[error("{actor} does not hold an admin role")]
    NotAdmin { actor: String },
    #[error("cannot {action} an application that is {status}")]
    NotPermitted {
        action: &'static str,
        status: &'static str,
    },
    #[error("application is for {found}, not {expected}")]
    ServiceMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("application must be vetted before approval")]
    NotVetted,
    #[error("vetting recommended {recommended}, not approval")]
    VettingDidNotRecommend { recommended: &'static str },
    #[error("a rejection reason is required")]
    MissingReason,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Admin-side state machine over stored applications.
///
/// Every operation is commit-then-notify: the store write lands first, and a
/// failed notice surfaces to the caller without rolling the decision back, so
/// notices are at-least-once against a committed state.
pub struct AdminWorkflowService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<S, N> AdminWorkflowService<S, N>
where
    S: ApplicationStore + 'static,
    N: DecisionNotifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// Records a vetting assessment and moves the application into review.
    ///
    /// `expected_service` guards against acting on an application pulled up
    /// from the wrong admin queue.
    pub fn vet(
        &self,
        id: &ApplicationId,
        admin: &AdminUser,
        expected_service: ServiceKind,
        assessment: VettingAssessment,
        now: DateTime<Utc>,
    ) -> Result<Application, WorkflowError> {
        let application = self.fetch_application(id)?;
        self.authorize(admin, &application, AdminAction::Vet)?;
        if application.service != expected_service {
            return Err(WorkflowError::ServiceMismatch {
                expected: expected_service.label(),
                found: application.service.label(),
            });
        }

        let recommendation = assessment.recommended_action;
        let mut data = application.data.clone();
        data.vetting = Some(assessment.recorded_by(&admin.id, now));
        data.advance_stage(ProcessingStage::Vetted, now, &admin.id);

        let updated = self.store.update(
            id,
            ApplicationPatch {
                status: Some(ApplicationStatus::InProgress),
                reference_number: None,
                data: Some(data),
                updated_at: now,
            },
        )?;
        info!(
            application = %id,
            admin = %admin.id,
            recommendation = recommendation.label(),
            "application vetted"
        );
        Ok(updated)
    }

    /// Completes the application and issues its credential reference.
    ///
    /// The only thing standing between a pending application and approval is
    /// the vetting recommendation; the document checklist is not consulted.
    pub fn approve(
        &self,
        id: &ApplicationId,
        admin: &AdminUser,
        now: DateTime<Utc>,
    ) -> Result<Application, WorkflowError> {
        let application = self.fetch_application(id)?;
        self.authorize(admin, &application, AdminAction::Approve)?;

        let Some(vetting) = application.data.vetting.as_ref() else {
            return Err(WorkflowError::NotVetted);
        };
        if vetting.recommended_action != RecommendedAction::Approve {
            return Err(WorkflowError::VettingDidNotRecommend {
                recommended: vetting.recommended_action.label(),
            });
        }

        let reference = ReferenceNumber::generate(application.service, now);
        let valid_until = now
            .checked_add_months(Months::new(VALIDITY_MONTHS))
            .unwrap_or(now);

        let mut data = application.data.clone();
        data.decision = Some(Decision::Approved(ApprovalInfo {
            approved_at: now,
            approved_by: admin.id.clone(),
            reference_number: reference.clone(),
            valid_from: now,
            valid_until,
        }));
        data.advance_stage(ProcessingStage::Approved, now, &admin.id);

        let updated = self.store.update(
            id,
            ApplicationPatch {
                status: Some(ApplicationStatus::Completed),
                reference_number: Some(reference.clone()),
                data: Some(data),
                updated_at: now,
            },
        )?;
        info!(
            application = %id,
            admin = %admin.id,
            reference = %reference,
            "application approved"
        );

        let mut details = BTreeMap::new();
        details.insert("service".to_string(), updated.service.label().to_string());
        details.insert("reference_number".to_string(), reference.as_str().to_string());
        details.insert("valid_until".to_string(), valid_until.to_rfc3339());
        self.notifier.notify(DecisionNotice {
            template: "application_approved".to_string(),
            application_id: id.clone(),
            details,
        })?;

        Ok(updated)
    }

    /// Rejects the application. Rejection is terminal for this application
    /// but leaves the citizen free to apply again.
    pub fn reject(
        &self,
        id: &ApplicationId,
        admin: &AdminUser,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Application, WorkflowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::MissingReason);
        }

        let application = self.fetch_application(id)?;
        self.authorize(admin, &application, AdminAction::Reject)?;

        let mut data = application.data.clone();
        data.decision = Some(Decision::Rejected(RejectionInfo {
            rejected_at: now,
            rejected_by: admin.id.clone(),
            reason: reason.to_string(),
            can_reapply: true,
        }));
        data.advance_stage(ProcessingStage::Rejected, now, &admin.id);

        let updated = self.store.update(
            id,
            ApplicationPatch {
                status: Some(ApplicationStatus::Rejected),
                reference_number: None,
                data: Some(data),
                updated_at: now,
            },
        )?;
        info!(application = %id, admin = %admin.id, "application rejected");

        let mut details = BTreeMap::new();
        details.insert("service".to_string(), updated.service.label().to_string());
        details.insert("reason".to_string(), reason.to_string());
        self.notifier.notify(DecisionNotice {
            template: "application_rejected".to_string(),
            application_id: id.clone(),
            details,
        })?;

        Ok(updated)
    }

    /// Asks the applicant for more material. The citizen-visible status stays
    /// `in_progress`; only the internal stage moves, and any vetting
    /// recommendation already on file is preserved.
    pub fn request_more_info(
        &self,
        id: &ApplicationId,
        admin: &AdminUser,
        details: &str,
        now: DateTime<Utc>,
    ) -> Result<Application, WorkflowError> {
        let application = self.fetch_application(id)?;
        self.authorize(admin, &application, AdminAction::RequestInfo)?;

        let mut data = application.data.clone();
        data.info_requests.push(InfoRequest {
            requested_at: now,
            requested_by: admin.id.clone(),
            details: details.to_string(),
            status: InfoRequestStatus::PendingResponse,
        });
        data.advance_stage(ProcessingStage::AwaitingInfo, now, &admin.id);

        let updated = self.store.update(
            id,
            ApplicationPatch {
                status: None,
                reference_number: None,
                data: Some(data),
                updated_at: now,
            },
        )?;
        info!(application = %id, admin = %admin.id, "more information requested");
        Ok(updated)
    }

    /// Writes the per-document verification checklist. Allowed on any
    /// application that has not reached a terminal status.
    pub fn record_document_checks(
        &self,
        id: &ApplicationId,
        admin: &AdminUser,
        verified: BTreeMap<DocumentKind, bool>,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<Application, WorkflowError> {
        let application = self.fetch_application(id)?;
        if !roles::is_admin(admin) {
            return Err(WorkflowError::NotAdmin {
                actor: admin.id.clone(),
            });
        }
        if application.status.is_terminal() {
            return Err(WorkflowError::NotPermitted {
                action: "record document checks for",
                status: application.status.label(),
            });
        }

        let mut data = application.data.clone();
        data.checklist = Some(DocumentChecklist {
            completed,
            verified,
            checked_by: admin.id.clone(),
            checked_at: now,
        });

        let updated = self.store.update(
            id,
            ApplicationPatch {
                status: None,
                reference_number: None,
                data: Some(data),
                updated_at: now,
            },
        )?;
        info!(application = %id, admin = %admin.id, completed, "document checks recorded");
        Ok(updated)
    }

    /// Document-side vetting completeness for one application.
    pub fn has_been_vetted(&self, id: &ApplicationId) -> Result<bool, WorkflowError> {
        let application = self.fetch_application(id)?;
        Ok(application.has_been_vetted())
    }

    /// Fetch an application for API responses.
    pub fn get(&self, id: &ApplicationId) -> Result<Application, WorkflowError> {
        self.fetch_application(id)
    }

    fn fetch_application(&self, id: &ApplicationId) -> Result<Application, WorkflowError> {
        self.store.fetch(id)?.ok_or(WorkflowError::NotFound)
    }

    fn authorize(
        &self,
        admin: &AdminUser,
        application: &Application,
        action: AdminAction,
    ) -> Result<(), WorkflowError> {
        if !roles::is_admin(admin) {
            return Err(WorkflowError::NotAdmin {
                actor: admin.id.clone(),
            });
        }
        if !roles::can_perform_action(admin, application, action) {
            return Err(WorkflowError::NotPermitted {
                action: action.label(),
                status: application.status.label(),
            });
        }
        Ok(())
    }
}
