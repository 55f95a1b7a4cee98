use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reference::ReferenceNumber;

/// Form field holding the applicant's public-service employment identifier.
pub const EMPLOYMENT_ID_FIELD: &str = "employment_id";

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Government services citizens can apply for through the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    CityPass,
    SevisPass,
    PublicServantPass,
    LearnersPermit,
    DriversLicense,
}

impl ServiceKind {
    pub const fn catalogue() -> [ServiceKind; 5] {
        [
            ServiceKind::CityPass,
            ServiceKind::SevisPass,
            ServiceKind::PublicServantPass,
            ServiceKind::LearnersPermit,
            ServiceKind::DriversLicense,
        ]
    }

    /// Human-facing service name as it appears in portal listings.
    pub const fn label(self) -> &'static str {
        match self {
            ServiceKind::CityPass => "City Pass",
            ServiceKind::SevisPass => "SEVIS Pass",
            ServiceKind::PublicServantPass => "Public Servant Pass",
            ServiceKind::LearnersPermit => "Learner's Permit Application",
            ServiceKind::DriversLicense => "Driver's License Renewal",
        }
    }

    /// Stable machine token, also the serde representation.
    pub const fn token(self) -> &'static str {
        match self {
            ServiceKind::CityPass => "city_pass",
            ServiceKind::SevisPass => "sevis_pass",
            ServiceKind::PublicServantPass => "public_servant_pass",
            ServiceKind::LearnersPermit => "learners_permit",
            ServiceKind::DriversLicense => "drivers_license",
        }
    }

    /// Prefix stamped on approval reference numbers for this service.
    pub const fn reference_prefix(self) -> &'static str {
        match self {
            ServiceKind::PublicServantPass => "PSP",
            ServiceKind::LearnersPermit => "LP",
            ServiceKind::DriversLicense => "DL",
            ServiceKind::CityPass | ServiceKind::SevisPass => "APP",
        }
    }

    /// Accepts either the display label or the machine token.
    pub fn from_name(value: &str) -> Option<ServiceKind> {
        let trimmed = value.trim();
        ServiceKind::catalogue()
            .into_iter()
            .find(|service| service.label() == trimmed || service.token() == trimmed)
    }
}

/// Citizen-visible lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Completed | ApplicationStatus::Rejected
        )
    }

    /// Whether an application in this status blocks the same citizen from
    /// submitting another one for the same service. Only rejection clears
    /// the way for a fresh attempt.
    pub const fn blocks_new_submission(self) -> bool {
        !matches!(self, ApplicationStatus::Rejected)
    }
}

/// Internal processing stage, finer grained than the citizen-visible status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Submitted,
    Vetted,
    AwaitingInfo,
    Approved,
    Rejected,
}

impl ProcessingStage {
    pub const fn label(self) -> &'static str {
        match self {
            ProcessingStage::Submitted => "submitted",
            ProcessingStage::Vetted => "vetted",
            ProcessingStage::AwaitingInfo => "awaiting_info",
            ProcessingStage::Approved => "approved",
            ProcessingStage::Rejected => "rejected",
        }
    }
}

/// Audit entry for a stage the application has already passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: ProcessingStage,
    pub recorded_at: DateTime<Utc>,
    pub actor: String,
}

/// Kinds of evidence an applicant declares with a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    NationalId,
    AddressProof,
    CategorySpecific,
}

/// Metadata for an uploaded document so stores can keep audit trails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDocument {
    pub kind: DocumentKind,
    pub name: String,
    pub storage_key: String,
}

/// Per-document verification results recorded by an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChecklist {
    pub completed: bool,
    pub verified: BTreeMap<DocumentKind, bool>,
    pub checked_by: String,
    pub checked_at: DateTime<Utc>,
}

/// Outcome an admin recommends after vetting an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Approve,
    Reject,
    RequestMoreInfo,
}

impl RecommendedAction {
    pub const fn label(self) -> &'static str {
        match self {
            RecommendedAction::Approve => "approve",
            RecommendedAction::Reject => "reject",
            RecommendedAction::RequestMoreInfo => "request_more_info",
        }
    }
}

/// Vetting assessment as supplied by the reviewing admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VettingAssessment {
    pub employment_verified: bool,
    pub email_verified: bool,
    pub background_check_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_clearance_level: Option<String>,
    pub recommended_action: RecommendedAction,
}

impl VettingAssessment {
    /// Stamps the assessment with the reviewing admin and time.
    pub fn recorded_by(self, admin_id: &str, vetted_at: DateTime<Utc>) -> VettingInfo {
        VettingInfo {
            employment_verified: self.employment_verified,
            email_verified: self.email_verified,
            background_check_required: self.background_check_required,
            security_clearance_level: self.security_clearance_level,
            recommended_action: self.recommended_action,
            vetted_by: admin_id.to_string(),
            vetted_at,
        }
    }
}

/// Vetting record kept on the application once review is done.
///
/// The recommendation survives later stage changes, so an application sent
/// back for more information can still be approved afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VettingInfo {
    pub employment_verified: bool,
    pub email_verified: bool,
    pub background_check_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_clearance_level: Option<String>,
    pub recommended_action: RecommendedAction,
    pub vetted_by: String,
    pub vetted_at: DateTime<Utc>,
}

/// Approval details, including the issued credential reference and validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalInfo {
    pub approved_at: DateTime<Utc>,
    pub approved_by: String,
    pub reference_number: ReferenceNumber,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Rejection details. `can_reapply` is always granted today; the field exists
/// so a future bar on repeat offenders does not need a schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionInfo {
    pub rejected_at: DateTime<Utc>,
    pub rejected_by: String,
    pub reason: String,
    pub can_reapply: bool,
}

/// Final outcome of the admin workflow, tagged by how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    Approved(ApprovalInfo),
    Rejected(RejectionInfo),
}

/// Marker tracking whether the applicant has responded to an info request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoRequestStatus {
    PendingResponse,
    Answered,
}

/// A request for additional material sent to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRequest {
    pub requested_at: DateTime<Utc>,
    pub requested_by: String,
    pub details: String,
    pub status: InfoRequestStatus,
}

/// Structured lifecycle payload carried by every application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationData {
    #[serde(default)]
    pub form: BTreeMap<String, String>,
    #[serde(default)]
    pub documents: Vec<DeclaredDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<DocumentChecklist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vetting: Option<VettingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info_requests: Vec<InfoRequest>,
    pub stage: ProcessingStage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<StageRecord>,
}

impl ApplicationData {
    pub fn new(form: BTreeMap<String, String>, documents: Vec<DeclaredDocument>) -> Self {
        Self {
            form,
            documents,
            checklist: None,
            vetting: None,
            decision: None,
            info_requests: Vec::new(),
            stage: ProcessingStage::Submitted,
            history: Vec::new(),
        }
    }

    /// Moves to `next`, appending the stage being left to the audit history.
    pub fn advance_stage(&mut self, next: ProcessingStage, at: DateTime<Utc>, actor: &str) {
        self.history.push(StageRecord {
            stage: self.stage,
            recorded_at: at,
            actor: actor.to_string(),
        });
        self.stage = next;
    }
}

/// What a citizen hands the portal when applying for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub user_id: String,
    pub service: ServiceKind,
    #[serde(default)]
    pub form: BTreeMap<String, String>,
    #[serde(default)]
    pub documents: Vec<DeclaredDocument>,
}

/// A stored application with its full lifecycle payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: String,
    pub service: ServiceKind,
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<ReferenceNumber>,
    pub data: ApplicationData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Document-side vetting completeness: the checklist is marked complete
    /// and every declared document is individually verified.
    ///
    /// Deliberately independent of `vetting.recommended_action`; the approval
    /// guard consults only the recommendation.
    pub fn has_been_vetted(&self) -> bool {
        let Some(checklist) = &self.data.checklist else {
            return false;
        };
        if !checklist.completed {
            return false;
        }
        self.data
            .documents
            .iter()
            .all(|document| checklist.verified.get(&document.kind).copied().unwrap_or(false))
    }

    pub fn decision_rationale(&self) -> String {
        match &self.data.decision {
            Some(Decision::Approved(info)) => {
                format!("approved; reference {}", info.reference_number)
            }
            Some(Decision::Rejected(info)) => format!("rejected: {}", info.reason),
            None => match self.data.stage {
                ProcessingStage::AwaitingInfo => {
                    "awaiting further information from the applicant".to_string()
                }
                ProcessingStage::Vetted => "vetted; awaiting decision".to_string(),
                _ => "pending review".to_string(),
            },
        }
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            service: self.service.label(),
            status: self.status.label(),
            stage: self.data.stage.label(),
            reference_number: self
                .reference_number
                .as_ref()
                .map(|reference| reference.as_str().to_string()),
            decision_rationale: self.decision_rationale(),
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub service: &'static str,
    pub status: &'static str,
    pub stage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    pub decision_rationale: String,
}
