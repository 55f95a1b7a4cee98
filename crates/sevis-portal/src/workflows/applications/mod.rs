//! Application eligibility and admin approval workflow for portal services.
//!
//! Three rule sets live here: the per-service application limits consulted at
//! submission time, the admin state machine that vets, approves, and rejects
//! stored applications, and the role resolver that maps directory accounts to
//! privilege tiers. Storage, the staff directory, and outbound notices sit
//! behind traits so the engines can be exercised against in-memory fakes.

pub mod domain;
pub mod intake;
pub mod limits;
pub mod reference;
pub mod roles;
pub mod router;
pub mod store;
pub mod throttle;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationData, ApplicationId, ApplicationStatus, ApplicationStatusView,
    ApplicationSubmission, ApprovalInfo, DeclaredDocument, Decision, DocumentChecklist,
    DocumentKind, InfoRequest, InfoRequestStatus, ProcessingStage, RecommendedAction,
    RejectionInfo, ServiceKind, StageRecord, VettingAssessment, VettingInfo, EMPLOYMENT_ID_FIELD,
};
pub use intake::{ApplicationIntakeService, IntakeError};
pub use limits::{ApplicationLimitsService, LimitDecision};
pub use reference::ReferenceNumber;
pub use roles::{AdminAction, AdminLevel, AdminUser, ADMIN_ROLES};
pub use router::{application_router, PortalState};
pub use store::{
    AdminDirectory, ApplicationPatch, ApplicationStore, DecisionNotice, DecisionNotifier,
    NotifyError, StoreError,
};
pub use throttle::{AdminAttemptThrottle, ThrottleConfig};
pub use workflow::{AdminWorkflowService, WorkflowError};
