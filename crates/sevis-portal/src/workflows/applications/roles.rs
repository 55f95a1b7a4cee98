use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationStatus};

/// Role strings the user directory may carry for portal staff.
pub const ADMIN_ROLES: [&str; 4] = ["admin", "super_admin", "approving_admin", "vetting_admin"];

/// Substrings planted in `national_id` by the first admin-provisioning tool,
/// before the directory's role column accepted the richer values.
const NATIONAL_ID_MARKERS: [(&str, AdminLevel); 3] = [
    ("SUPER_ADMIN", AdminLevel::SuperAdmin),
    ("APPROVING_ADMIN", AdminLevel::ApprovingAdmin),
    ("VETTING_ADMIN", AdminLevel::VettingAdmin),
];

/// Exact `photo_url` values used by the same legacy tool.
const PHOTO_URL_MARKERS: [(&str, AdminLevel); 3] = [
    ("super_admin", AdminLevel::SuperAdmin),
    ("approving_admin", AdminLevel::ApprovingAdmin),
    ("vetting_admin", AdminLevel::VettingAdmin),
];

/// Directory view of a portal staff account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub display_name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Privilege tier resolved from a staff account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    Admin,
    VettingAdmin,
    ApprovingAdmin,
    SuperAdmin,
}

impl AdminLevel {
    pub const fn label(self) -> &'static str {
        match self {
            AdminLevel::Admin => "admin",
            AdminLevel::VettingAdmin => "vetting_admin",
            AdminLevel::ApprovingAdmin => "approving_admin",
            AdminLevel::SuperAdmin => "super_admin",
        }
    }

    fn from_role(role: &str) -> Option<AdminLevel> {
        match role {
            "admin" => Some(AdminLevel::Admin),
            "vetting_admin" => Some(AdminLevel::VettingAdmin),
            "approving_admin" => Some(AdminLevel::ApprovingAdmin),
            "super_admin" => Some(AdminLevel::SuperAdmin),
            _ => None,
        }
    }

    fn from_legacy_markers(user: &AdminUser) -> Option<AdminLevel> {
        if let Some(national_id) = &user.national_id {
            for (marker, level) in NATIONAL_ID_MARKERS {
                if national_id.contains(marker) {
                    return Some(level);
                }
            }
        }
        if let Some(photo_url) = &user.photo_url {
            for (marker, level) in PHOTO_URL_MARKERS {
                if photo_url == marker {
                    return Some(level);
                }
            }
        }
        None
    }

    /// Resolves the privilege tier for an account.
    ///
    /// Precedence: an explicit role string wins outright, legacy field
    /// markers are consulted only when the role resolves to nothing, and
    /// anything else lands on the base tier.
    pub fn resolve(user: &AdminUser) -> AdminLevel {
        AdminLevel::from_role(&user.role)
            .or_else(|| AdminLevel::from_legacy_markers(user))
            .unwrap_or(AdminLevel::Admin)
    }
}

/// Whether the account's role string is one of the recognized admin roles.
pub fn is_admin(user: &AdminUser) -> bool {
    AdminLevel::from_role(&user.role).is_some()
}

pub fn is_super_admin(user: &AdminUser) -> bool {
    AdminLevel::resolve(user) == AdminLevel::SuperAdmin
}

/// Any admin may approve today. The vetting and approving tiers exist in the
/// directory but are not yet distinct gates here.
pub fn can_approve(user: &AdminUser) -> bool {
    is_admin(user)
}

/// Any admin may vet today, mirroring `can_approve`.
pub fn can_vet(user: &AdminUser) -> bool {
    is_admin(user)
}

/// Workflow actions gated by role and application status together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Vet,
    Approve,
    Reject,
    RequestInfo,
}

impl AdminAction {
    pub const fn label(self) -> &'static str {
        match self {
            AdminAction::Vet => "vet",
            AdminAction::Approve => "approve",
            AdminAction::Reject => "reject",
            AdminAction::RequestInfo => "request_info",
        }
    }
}

/// Combined role and status gate for one admin action on one application.
pub fn can_perform_action(user: &AdminUser, application: &Application, action: AdminAction) -> bool {
    match action {
        AdminAction::Vet => can_vet(user) && application.status == ApplicationStatus::Pending,
        AdminAction::Approve | AdminAction::Reject => {
            can_approve(user)
                && matches!(
                    application.status,
                    ApplicationStatus::Pending | ApplicationStatus::InProgress
                )
        }
        AdminAction::RequestInfo => {
            (can_approve(user) || can_vet(user))
                && application.status == ApplicationStatus::InProgress
        }
    }
}
