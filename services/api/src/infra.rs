use metrics_exporter_prometheus::PrometheusHandle;
use sevis_portal::config::AdminSecurityConfig;
use sevis_portal::workflows::applications::{
    AdminAttemptThrottle, AdminDirectory, AdminUser, Application, ApplicationId, ApplicationPatch,
    ApplicationStore, DecisionNotice, DecisionNotifier, NotifyError, ServiceKind, StoreError,
    ThrottleConfig,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Application rows keyed by id. Ids are issued from a monotonic sequence,
/// so iteration order doubles as submission order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationStore {
    records: Arc<Mutex<BTreeMap<ApplicationId, Application>>>,
}

impl ApplicationStore for InMemoryApplicationStore {
    fn insert(&self, application: Application) -> Result<Application, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(StoreError::Conflict);
        }
        if let Some(existing) = guard.values().find(|candidate| {
            candidate.user_id == application.user_id
                && candidate.service == application.service
                && candidate.status.blocks_new_submission()
        }) {
            return Err(StoreError::OpenApplicationExists {
                service: existing.service.label(),
                existing_id: existing.id.clone(),
            });
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(
        &self,
        id: &ApplicationId,
        patch: ApplicationPatch,
    ) -> Result<Application, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(reference) = patch.reference_number {
            record.reference_number = Some(reference);
        }
        if let Some(data) = patch.data {
            record.data = data;
        }
        record.updated_at = patch.updated_at;
        Ok(record.clone())
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_user(&self, user_id: &str) -> Result<Vec<Application>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|application| application.user_id == user_id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<Application>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn delete(&self, id: &ApplicationId) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAdminDirectory {
    admins: Arc<Mutex<HashMap<String, AdminUser>>>,
}

impl InMemoryAdminDirectory {
    /// Staff accounts for local runs: one of each explicit role, plus a
    /// legacy record whose level only resolves through its field markers.
    pub(crate) fn seed_demo_admins() -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.admins.lock().expect("directory mutex poisoned");
            for admin in [
                AdminUser {
                    id: "adm-vet".to_string(),
                    display_name: "Vetting Officer".to_string(),
                    role: "vetting_admin".to_string(),
                    national_id: Some("CIV-88-1204".to_string()),
                    photo_url: None,
                },
                AdminUser {
                    id: "adm-approve".to_string(),
                    display_name: "Approving Officer".to_string(),
                    role: "approving_admin".to_string(),
                    national_id: Some("CIV-91-0533".to_string()),
                    photo_url: None,
                },
                AdminUser {
                    id: "adm-root".to_string(),
                    display_name: "Portal Administrator".to_string(),
                    role: "super_admin".to_string(),
                    national_id: Some("CIV-79-2210".to_string()),
                    photo_url: None,
                },
                AdminUser {
                    id: "adm-legacy".to_string(),
                    display_name: "Legacy Provisioned Account".to_string(),
                    role: "user".to_string(),
                    national_id: Some("CIV-85-SUPER_ADMIN-0042".to_string()),
                    photo_url: None,
                },
            ] {
                guard.insert(admin.id.clone(), admin);
            }
        }
        directory
    }
}

impl AdminDirectory for InMemoryAdminDirectory {
    fn fetch_admin(&self, admin_id: &str) -> Result<Option<AdminUser>, StoreError> {
        let guard = self.admins.lock().expect("directory mutex poisoned");
        Ok(guard.get(admin_id).cloned())
    }
}

/// Collects decision notices instead of dispatching SMS or e-mail.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDecisionNotifier {
    events: Arc<Mutex<Vec<DecisionNotice>>>,
}

impl DecisionNotifier for InMemoryDecisionNotifier {
    fn notify(&self, notice: DecisionNotice) -> Result<(), NotifyError> {
        let mut guard = self.events.lock().expect("notifier mutex poisoned");
        guard.push(notice);
        Ok(())
    }
}

impl InMemoryDecisionNotifier {
    pub(crate) fn events(&self) -> Vec<DecisionNotice> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

pub(crate) fn admin_throttle(config: &AdminSecurityConfig) -> AdminAttemptThrottle {
    AdminAttemptThrottle::new(ThrottleConfig {
        max_failures: config.failure_limit,
        window: config.failure_window,
        ..ThrottleConfig::default()
    })
}

pub(crate) fn parse_service(raw: &str) -> Result<ServiceKind, String> {
    ServiceKind::from_name(raw).ok_or_else(|| {
        let known = ServiceKind::catalogue()
            .into_iter()
            .map(ServiceKind::token)
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown service '{raw}' (expected one of: {known})")
    })
}
