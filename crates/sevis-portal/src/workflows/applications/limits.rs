use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::domain::{Application, ApplicationStatus, ServiceKind, EMPLOYMENT_ID_FIELD};
use super::store::{ApplicationStore, StoreError};

/// Follow-up suggestions surfaced alongside a denial.
pub const ACTION_WAIT: &str = "Wait for your current application to be processed";
pub const ACTION_CHECK_STATUS: &str = "Check your application status";
pub const ACTION_CONTACT_SUPPORT: &str = "Contact the service desk";

/// Canned reason used when the store cannot be consulted at all.
pub const DATABASE_ERROR_REASON: &str = "database error";

/// Outcome of an eligibility check, shaped for direct serialization.
///
/// Denial is data, not an error: `can_apply: false` plus a human reason and
/// suggested next steps. `existing` carries the application the decision
/// hinges on so portal surfaces can link to it.
#[derive(Debug, Clone, Serialize)]
pub struct LimitDecision {
    pub can_apply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<Application>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggested_actions: Vec<&'static str>,
}

impl LimitDecision {
    pub fn allowed() -> LimitDecision {
        LimitDecision {
            can_apply: true,
            reason: None,
            existing: None,
            suggested_actions: Vec::new(),
        }
    }

    /// Allowed, with context about the prior attempt being retried.
    pub fn allowed_after(reason: String, existing: Application) -> LimitDecision {
        LimitDecision {
            can_apply: true,
            reason: Some(reason),
            existing: Some(existing),
            suggested_actions: Vec::new(),
        }
    }

    pub fn denied(
        reason: String,
        existing: Option<Application>,
        suggested_actions: Vec<&'static str>,
    ) -> LimitDecision {
        LimitDecision {
            can_apply: false,
            reason: Some(reason),
            existing,
            suggested_actions,
        }
    }

    /// Uniform stand-in when the store itself failed.
    pub fn store_failure() -> LimitDecision {
        LimitDecision::denied(
            DATABASE_ERROR_REASON.to_string(),
            None,
            vec![ACTION_CONTACT_SUPPORT],
        )
    }
}

/// Read-side eligibility rules over a citizen's application history.
pub struct ApplicationLimitsService<S> {
    store: Arc<S>,
}

impl<S> ApplicationLimitsService<S>
where
    S: ApplicationStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The general one-open-application rule for a `(user, service)` pair.
    ///
    /// Precedence when history holds several rows: a completed application
    /// denies permanently, then any open one denies until processed, and a
    /// history of nothing but rejections allows a fresh attempt.
    pub fn can_apply_for_service(
        &self,
        user_id: &str,
        service: ServiceKind,
    ) -> Result<LimitDecision, StoreError> {
        let mut history = self.store.for_user(user_id)?;
        history.retain(|application| application.service == service);

        if history.is_empty() {
            return Ok(LimitDecision::allowed());
        }

        if let Some(completed) = history
            .iter()
            .find(|application| application.status == ApplicationStatus::Completed)
        {
            return Ok(LimitDecision::denied(
                format!("You already have a completed {} application", service.label()),
                Some(completed.clone()),
                vec![ACTION_CHECK_STATUS, ACTION_CONTACT_SUPPORT],
            ));
        }

        // First open row in store order; ties between open rows are broken
        // by whatever order the store returns.
        if let Some(open) = history.iter().find(|application| {
            matches!(
                application.status,
                ApplicationStatus::Pending | ApplicationStatus::InProgress
            )
        }) {
            let reason = match open.status {
                ApplicationStatus::Pending => {
                    format!("You already have a pending {} application", service.label())
                }
                _ => format!("You already have a {} application in progress", service.label()),
            };
            return Ok(LimitDecision::denied(
                reason,
                Some(open.clone()),
                vec![ACTION_WAIT, ACTION_CHECK_STATUS, ACTION_CONTACT_SUPPORT],
            ));
        }

        // Only rejected rows remain.
        let latest = history
            .iter()
            .max_by_key(|application| application.created_at)
            .cloned();
        Ok(match latest {
            Some(rejected) => LimitDecision::allowed_after(
                format!(
                    "Your previous {} application was rejected; you may apply again",
                    service.label()
                ),
                rejected,
            ),
            None => LimitDecision::allowed(),
        })
    }

    /// The general rule plus any service-specific constraint.
    ///
    /// `form` is the would-be submission's form payload; surfaces that only
    /// probe eligibility pass `None` and skip form-dependent constraints.
    pub fn check_service_limits(
        &self,
        user_id: &str,
        service: ServiceKind,
        form: Option<&BTreeMap<String, String>>,
    ) -> Result<LimitDecision, StoreError> {
        let general = self.can_apply_for_service(user_id, service)?;
        if !general.can_apply {
            return Ok(general);
        }

        match service {
            ServiceKind::PublicServantPass => {
                self.employment_id_unclaimed(user_id, service, form, general)
            }
            // The remaining services reserve this hook but add nothing today.
            _ => Ok(general),
        }
    }

    /// Public Servant Pass only: one pass per employment identifier, across
    /// all citizens. A full scan; the nested form field has no index.
    fn employment_id_unclaimed(
        &self,
        user_id: &str,
        service: ServiceKind,
        form: Option<&BTreeMap<String, String>>,
        general: LimitDecision,
    ) -> Result<LimitDecision, StoreError> {
        let Some(employment_id) = form
            .and_then(|fields| fields.get(EMPLOYMENT_ID_FIELD))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
        else {
            return Ok(general);
        };

        let claimed = self.store.all()?.into_iter().any(|application| {
            application.service == service
                && application.user_id != user_id
                && application
                    .data
                    .form
                    .get(EMPLOYMENT_ID_FIELD)
                    .map(|value| value.trim() == employment_id)
                    .unwrap_or(false)
        });

        if claimed {
            return Ok(LimitDecision::denied(
                format!("Employment ID {employment_id} is already registered by another applicant"),
                None,
                vec![ACTION_CONTACT_SUPPORT],
            ));
        }
        Ok(general)
    }
}
