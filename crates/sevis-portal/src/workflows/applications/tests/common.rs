use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::applications::domain::{
    Application, ApplicationData, ApplicationId, ApplicationStatus, ApplicationSubmission,
    DeclaredDocument, DocumentKind, RecommendedAction, ServiceKind, VettingAssessment,
    EMPLOYMENT_ID_FIELD,
};
use crate::workflows::applications::intake::ApplicationIntakeService;
use crate::workflows::applications::limits::ApplicationLimitsService;
use crate::workflows::applications::roles::AdminUser;
use crate::workflows::applications::store::{
    AdminDirectory, ApplicationPatch, ApplicationStore, DecisionNotice, DecisionNotifier,
    NotifyError, StoreError,
};
use crate::workflows::applications::throttle::AdminAttemptThrottle;
use crate::workflows::applications::workflow::AdminWorkflowService;
use crate::workflows::applications::PortalState;

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn minutes_after(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

pub(super) fn documents() -> Vec<DeclaredDocument> {
    vec![
        DeclaredDocument {
            kind: DocumentKind::NationalId,
            name: "National ID card".to_string(),
            storage_key: "uploads/cit-100/national-id.pdf".to_string(),
        },
        DeclaredDocument {
            kind: DocumentKind::CategorySpecific,
            name: "Employment letter".to_string(),
            storage_key: "uploads/cit-100/employment-letter.pdf".to_string(),
        },
    ]
}

pub(super) fn psp_submission(user_id: &str) -> ApplicationSubmission {
    let mut form = BTreeMap::new();
    form.insert(EMPLOYMENT_ID_FIELD.to_string(), "EMP-2210".to_string());
    form.insert("department".to_string(), "Department of Finance".to_string());
    ApplicationSubmission {
        user_id: user_id.to_string(),
        service: ServiceKind::PublicServantPass,
        form,
        documents: documents(),
    }
}

pub(super) fn city_submission(user_id: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        user_id: user_id.to_string(),
        service: ServiceKind::CityPass,
        form: BTreeMap::new(),
        documents: vec![DeclaredDocument {
            kind: DocumentKind::AddressProof,
            name: "Utility bill".to_string(),
            storage_key: "uploads/cit-100/utility-bill.pdf".to_string(),
        }],
    }
}

pub(super) fn admin(id: &str, role: &str) -> AdminUser {
    AdminUser {
        id: id.to_string(),
        display_name: format!("Officer {id}"),
        role: role.to_string(),
        national_id: Some(format!("CIV-{id}")),
        photo_url: None,
    }
}

pub(super) fn assessment(recommended_action: RecommendedAction) -> VettingAssessment {
    VettingAssessment {
        employment_verified: true,
        email_verified: true,
        background_check_required: false,
        security_clearance_level: Some("L2".to_string()),
        recommended_action,
    }
}

/// A bare stored application for history fixtures, bypassing intake.
pub(super) fn stored_application(
    id: &str,
    user_id: &str,
    service: ServiceKind,
    status: ApplicationStatus,
    created_at: DateTime<Utc>,
) -> Application {
    Application {
        id: ApplicationId(id.to_string()),
        user_id: user_id.to_string(),
        service,
        status,
        reference_number: None,
        data: ApplicationData::new(BTreeMap::new(), Vec::new()),
        created_at,
        updated_at: created_at,
    }
}

pub(super) fn limits_service(store: Arc<MemoryStore>) -> ApplicationLimitsService<MemoryStore> {
    ApplicationLimitsService::new(store)
}

pub(super) fn intake_service(store: Arc<MemoryStore>) -> ApplicationIntakeService<MemoryStore> {
    ApplicationIntakeService::new(store)
}

pub(super) fn workflow_service(
    store: Arc<MemoryStore>,
    notifier: Arc<MemoryNotifier>,
) -> AdminWorkflowService<MemoryStore, MemoryNotifier> {
    AdminWorkflowService::new(store, notifier)
}

pub(super) fn directory_with_staff() -> MemoryDirectory {
    MemoryDirectory::with(vec![
        admin("adm-1", "admin"),
        admin("adm-vet", "vetting_admin"),
        admin("adm-approve", "approving_admin"),
        admin("adm-root", "super_admin"),
        admin("usr-9", "user"),
    ])
}

pub(super) fn build_portal() -> (
    PortalState<MemoryStore, MemoryDirectory, MemoryNotifier>,
    Arc<MemoryStore>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let state = PortalState::new(
        Arc::clone(&store),
        Arc::new(directory_with_staff()),
        Arc::clone(&notifier),
        Arc::new(AdminAttemptThrottle::new(Default::default())),
    );
    (state, store, notifier)
}

#[derive(Default, Clone)]
pub(super) struct MemoryStore {
    records: Arc<Mutex<BTreeMap<ApplicationId, Application>>>,
}

impl ApplicationStore for MemoryStore {
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

    fn update(&self, id: &ApplicationId, patch: ApplicationPatch) -> Result<Application, StoreError> {
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

pub(super) struct UnavailableStore;

impl ApplicationStore for UnavailableStore {
    fn insert(&self, _application: Application) -> Result<Application, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _id: &ApplicationId,
        _patch: ApplicationPatch,
    ) -> Result<Application, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn for_user(&self, _user_id: &str) -> Result<Vec<Application>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Application>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &ApplicationId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    admins: Arc<Mutex<HashMap<String, AdminUser>>>,
}

impl MemoryDirectory {
    pub(super) fn with(admins: Vec<AdminUser>) -> Self {
        let directory = Self::default();
        {
            let mut guard = directory.admins.lock().expect("directory mutex poisoned");
            for admin in admins {
                guard.insert(admin.id.clone(), admin);
            }
        }
        directory
    }
}

impl AdminDirectory for MemoryDirectory {
    fn fetch_admin(&self, admin_id: &str) -> Result<Option<AdminUser>, StoreError> {
        let guard = self.admins.lock().expect("directory mutex poisoned");
        Ok(guard.get(admin_id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<DecisionNotice>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<DecisionNotice> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl DecisionNotifier for MemoryNotifier {
    fn notify(&self, notice: DecisionNotice) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl DecisionNotifier for FailingNotifier {
    fn notify(&self, _notice: DecisionNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay down".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
