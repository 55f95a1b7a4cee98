use super::common::*;

use crate::workflows::applications::domain::{ApplicationStatus, ServiceKind};
use crate::workflows::applications::roles::{
    can_approve, can_perform_action, can_vet, is_admin, is_super_admin, AdminAction, AdminLevel,
    AdminUser, ADMIN_ROLES,
};

fn account(role: &str, national_id: Option<&str>, photo_url: Option<&str>) -> AdminUser {
    AdminUser {
        id: "adm-77".to_string(),
        display_name: "Officer Seventy-Seven".to_string(),
        role: role.to_string(),
        national_id: national_id.map(str::to_string),
        photo_url: photo_url.map(str::to_string),
    }
}

#[test]
fn explicit_role_wins_over_legacy_markers() {
    // The role column says plain admin even though the legacy marker says
    // super admin; the explicit role must win.
    let user = account("admin", Some("X-SUPER_ADMIN-042"), None);
    assert_eq!(AdminLevel::resolve(&user), AdminLevel::Admin);

    let user = account("super_admin", Some("X-VETTING_ADMIN-042"), None);
    assert_eq!(AdminLevel::resolve(&user), AdminLevel::SuperAdmin);
}

#[test]
fn national_id_markers_match_as_substrings() {
    let user = account("user", Some("PNG-VETTING_ADMIN-1999"), None);
    assert_eq!(AdminLevel::resolve(&user), AdminLevel::VettingAdmin);

    let user = account("user", Some("PNG-SUPER_ADMIN-2001"), None);
    assert_eq!(AdminLevel::resolve(&user), AdminLevel::SuperAdmin);
}

#[test]
fn photo_url_markers_require_exact_equality() {
    let user = account("user", None, Some("approving_admin"));
    assert_eq!(AdminLevel::resolve(&user), AdminLevel::ApprovingAdmin);

    // A URL merely containing the marker is not a marker.
    let user = account("user", None, Some("https://cdn/approving_admin.png"));
    assert_eq!(AdminLevel::resolve(&user), AdminLevel::Admin);
}

#[test]
fn unmarked_accounts_default_to_the_base_tier() {
    let user = account("user", Some("PNG-1987-0042"), Some("https://cdn/p.png"));
    assert_eq!(AdminLevel::resolve(&user), AdminLevel::Admin);
}

#[test]
fn is_admin_consults_only_the_role_string() {
    for role in ADMIN_ROLES {
        assert!(is_admin(&account(role, None, None)), "role: {role}");
    }
    assert!(!is_admin(&account("user", None, None)));
    // Marker-only accounts resolve to a level but do not pass the role gate.
    assert!(!is_admin(&account("user", Some("X-SUPER_ADMIN-1"), None)));
}

#[test]
fn super_admin_resolves_through_markers_too() {
    assert!(is_super_admin(&account("super_admin", None, None)));
    assert!(is_super_admin(&account("user", Some("X-SUPER_ADMIN-1"), None)));
    assert!(!is_super_admin(&account("admin", None, None)));
}

#[test]
fn every_admin_role_may_vet_and_approve() {
    for role in ADMIN_ROLES {
        let user = account(role, None, None);
        assert!(can_vet(&user), "role: {role}");
        assert!(can_approve(&user), "role: {role}");
    }
    let citizen = account("user", None, None);
    assert!(!can_vet(&citizen));
    assert!(!can_approve(&citizen));
}

#[test]
fn action_gates_combine_role_and_status() {
    let reviewer = account("admin", None, None);
    let pending = stored_application(
        "fix-100001",
        "cit-100",
        ServiceKind::CityPass,
        ApplicationStatus::Pending,
        t0(),
    );
    let in_progress = stored_application(
        "fix-100002",
        "cit-100",
        ServiceKind::CityPass,
        ApplicationStatus::InProgress,
        t0(),
    );
    let completed = stored_application(
        "fix-100003",
        "cit-100",
        ServiceKind::CityPass,
        ApplicationStatus::Completed,
        t0(),
    );

    assert!(can_perform_action(&reviewer, &pending, AdminAction::Vet));
    assert!(!can_perform_action(&reviewer, &in_progress, AdminAction::Vet));

    assert!(can_perform_action(&reviewer, &pending, AdminAction::Approve));
    assert!(can_perform_action(&reviewer, &in_progress, AdminAction::Approve));
    assert!(!can_perform_action(&reviewer, &completed, AdminAction::Approve));

    assert!(can_perform_action(&reviewer, &in_progress, AdminAction::Reject));
    assert!(!can_perform_action(&reviewer, &completed, AdminAction::Reject));

    assert!(!can_perform_action(&reviewer, &pending, AdminAction::RequestInfo));
    assert!(can_perform_action(&reviewer, &in_progress, AdminAction::RequestInfo));

    let citizen = account("user", None, None);
    assert!(!can_perform_action(&citizen, &pending, AdminAction::Vet));
}
