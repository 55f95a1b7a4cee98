use crate::infra::{InMemoryAdminDirectory, InMemoryApplicationStore, InMemoryDecisionNotifier};
use crate::routes::service_catalogue;
use chrono::Utc;
use clap::Args;
use sevis_portal::error::AppError;
use sevis_portal::workflows::applications::{
    AdminDirectory, AdminLevel, AdminWorkflowService, ApplicationIntakeService,
    ApplicationSubmission, DeclaredDocument, Decision, DocumentKind, RecommendedAction,
    ServiceKind, VettingAssessment, EMPLOYMENT_ID_FIELD,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Citizen identifier used for the walkthrough submission.
    #[arg(long, default_value = "cit-100")]
    pub(crate) user: String,
    /// Service to apply for (display name or token).
    #[arg(long, default_value = "public_servant_pass", value_parser = crate::infra::parse_service)]
    pub(crate) service: ServiceKind,
    /// Skip the admin vetting and approval portion of the demo.
    #[arg(long)]
    pub(crate) skip_admin: bool,
}

pub(crate) fn run_service_catalogue() -> Result<(), AppError> {
    println!("Services available through the portal");
    for entry in service_catalogue() {
        println!(
            "- {} ({}) -> approvals referenced {}-YYYYMM-NNNNNN-XX",
            entry.name, entry.token, entry.reference_prefix
        );
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        user,
        service,
        skip_admin,
    } = args;

    println!("SEVIS portal walkthrough");
    println!("Applying for: {} (citizen {user})", service.label());

    let store = Arc::new(InMemoryApplicationStore::default());
    let directory = InMemoryAdminDirectory::seed_demo_admins();
    let notifier = Arc::new(InMemoryDecisionNotifier::default());
    let intake = ApplicationIntakeService::new(Arc::clone(&store));
    let workflow = AdminWorkflowService::new(Arc::clone(&store), Arc::clone(&notifier));

    println!("\nStaff roster and resolved levels");
    for admin_id in ["adm-vet", "adm-approve", "adm-root", "adm-legacy"] {
        match directory.fetch_admin(admin_id) {
            Ok(Some(account)) => println!(
                "- {} (role '{}') -> level {}",
                account.id,
                account.role,
                AdminLevel::resolve(&account).label()
            ),
            Ok(None) => println!("- {admin_id}: not provisioned"),
            Err(err) => println!("- {admin_id}: directory unavailable ({err})"),
        }
    }

    println!("\nCitizen submission");
    let submission = demo_submission(&user, service);
    let application = match intake.submit(submission, Utc::now()) {
        Ok(application) => application,
        Err(err) => {
            println!("  Submission refused: {err}");
            return Ok(());
        }
    };
    let view = application.status_view();
    println!(
        "- Received application {} -> status {}",
        view.application_id, view.status
    );
    println!("  Decision rationale: {}", view.decision_rationale);

    match intake.limits().check_service_limits(&user, service, None) {
        Ok(decision) => {
            println!(
                "  Repeat eligibility: can_apply={} ({})",
                decision.can_apply,
                decision.reason.as_deref().unwrap_or("no reason recorded")
            );
        }
        Err(err) => println!("  Repeat eligibility unavailable: {err}"),
    }

    if skip_admin {
        return Ok(());
    }

    let vetter = match directory.fetch_admin("adm-vet") {
        Ok(Some(account)) => account,
        _ => {
            println!("  Vetting officer missing from the directory");
            return Ok(());
        }
    };
    let approver = match directory.fetch_admin("adm-approve") {
        Ok(Some(account)) => account,
        _ => {
            println!("  Approving officer missing from the directory");
            return Ok(());
        }
    };

    println!("\nAdmin workflow");
    let assessment = VettingAssessment {
        employment_verified: true,
        email_verified: true,
        background_check_required: false,
        security_clearance_level: Some("L2".to_string()),
        recommended_action: RecommendedAction::Approve,
    };
    if let Err(err) = workflow.vet(&application.id, &vetter, service, assessment, Utc::now()) {
        println!("  Vetting failed: {err}");
        return Ok(());
    }
    println!("- Vetted by {} with recommendation 'approve'", vetter.id);

    let mut verified = BTreeMap::new();
    for document in &application.data.documents {
        verified.insert(document.kind, true);
    }
    match workflow.record_document_checks(&application.id, &vetter, verified, true, Utc::now()) {
        Ok(_) => match workflow.has_been_vetted(&application.id) {
            Ok(complete) => println!("- Document checks recorded (fully verified: {complete})"),
            Err(err) => println!("  Vetting completeness unavailable: {err}"),
        },
        Err(err) => println!("  Document checks failed: {err}"),
    }

    match workflow.request_more_info(
        &application.id,
        &vetter,
        "Upload a certified copy of the employment letter",
        Utc::now(),
    ) {
        Ok(paused) => println!(
            "- Additional information requested (stage {})",
            paused.data.stage.label()
        ),
        Err(err) => println!("  Information request failed: {err}"),
    }

    let approved = match workflow.approve(&application.id, &approver, Utc::now()) {
        Ok(approved) => approved,
        Err(err) => {
            println!("  Approval failed: {err}");
            return Ok(());
        }
    };
    match &approved.data.decision {
        Some(Decision::Approved(info)) => {
            println!(
                "- Approved by {}; reference {} valid until {}",
                info.approved_by,
                info.reference_number,
                info.valid_until.format("%Y-%m-%d")
            );
        }
        _ => println!("- Approved, but the decision record is missing"),
    }

    match intake.limits().check_service_limits(&user, service, None) {
        Ok(decision) => println!(
            "  Post-approval eligibility: can_apply={} ({})",
            decision.can_apply,
            decision.reason.as_deref().unwrap_or("no reason recorded")
        ),
        Err(err) => println!("  Post-approval eligibility unavailable: {err}"),
    }

    match serde_json::to_string_pretty(&approved.status_view()) {
        Ok(json) => println!("  Public status payload:\n{json}"),
        Err(err) => println!("  Public status payload unavailable: {err}"),
    }

    println!("\nRejection and reapplication");
    let second_submission = demo_submission("cit-200", service);
    match intake.submit(second_submission, Utc::now()) {
        Ok(second) => {
            if let Err(err) = workflow.reject(
                &second.id,
                &approver,
                "Employment letter could not be verified",
                Utc::now(),
            ) {
                println!("  Rejection failed: {err}");
            } else {
                println!("- Application {} rejected", second.id);
                match intake.limits().check_service_limits("cit-200", service, None) {
                    Ok(decision) => println!(
                        "- Reapplication allowed: can_apply={} ({})",
                        decision.can_apply,
                        decision.reason.as_deref().unwrap_or("fresh start")
                    ),
                    Err(err) => println!("  Reapplication check unavailable: {err}"),
                }
            }
        }
        Err(err) => println!("  Second submission refused: {err}"),
    }

    let events = notifier.events();
    if events.is_empty() {
        println!("\nDecision notices: none dispatched");
    } else {
        println!("\nDecision notices");
        for notice in events {
            println!("- template={} -> {}", notice.template, notice.application_id);
        }
    }

    Ok(())
}

fn demo_submission(user_id: &str, service: ServiceKind) -> ApplicationSubmission {
    let mut form = BTreeMap::new();
    if service == ServiceKind::PublicServantPass {
        form.insert(EMPLOYMENT_ID_FIELD.to_string(), format!("EMP-{user_id}"));
        form.insert("department".to_string(), "Department of Finance".to_string());
    }

    ApplicationSubmission {
        user_id: user_id.to_string(),
        service,
        form,
        documents: vec![
            DeclaredDocument {
                kind: DocumentKind::NationalId,
                name: "National ID card".to_string(),
                storage_key: format!("uploads/{user_id}/national-id.pdf"),
            },
            DeclaredDocument {
                kind: DocumentKind::AddressProof,
                name: "Utility bill".to_string(),
                storage_key: format!("uploads/{user_id}/utility-bill.pdf"),
            },
            DeclaredDocument {
                kind: DocumentKind::CategorySpecific,
                name: "Employment letter".to_string(),
                storage_key: format!("uploads/{user_id}/employment-letter.pdf"),
            },
        ],
    }
}
