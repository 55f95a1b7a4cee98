use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{Application, ApplicationData, ApplicationId, ApplicationStatus, ApplicationSubmission};
use super::limits::{ApplicationLimitsService, LimitDecision};
use super::store::{ApplicationStore, StoreError};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn denial_reason(decision: &LimitDecision) -> &str {
    decision.reason.as_deref().unwrap_or("an existing application")
}

/// Error raised when a submission cannot be accepted.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("submission denied: {}", denial_reason(.0))]
    Denied(LimitDecision),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Front door for citizen submissions: eligibility check, then persistence.
pub struct ApplicationIntakeService<S> {
    store: Arc<S>,
    limits: ApplicationLimitsService<S>,
}

impl<S> ApplicationIntakeService<S>
where
    S: ApplicationStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            limits: ApplicationLimitsService::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn limits(&self) -> &ApplicationLimitsService<S> {
        &self.limits
    }

    /// Accepts a submission, returning the stored pending application.
    ///
    /// The limits pass here produces the friendly denial; the store re-checks
    /// open-uniqueness under its own lock, which is what actually holds under
    /// concurrent submissions.
    pub fn submit(
        &self,
        submission: ApplicationSubmission,
        now: DateTime<Utc>,
    ) -> Result<Application, IntakeError> {
        let decision = self.limits.check_service_limits(
            &submission.user_id,
            submission.service,
            Some(&submission.form),
        )?;
        if !decision.can_apply {
            return Err(IntakeError::Denied(decision));
        }

        let application = Application {
            id: next_application_id(),
            user_id: submission.user_id,
            service: submission.service,
            status: ApplicationStatus::Pending,
            reference_number: None,
            data: ApplicationData::new(submission.form, submission.documents),
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert(application)?;
        info!(
            application = %stored.id,
            service = stored.service.label(),
            "application submitted"
        );
        Ok(stored)
    }
}
