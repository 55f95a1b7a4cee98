use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationData, ApplicationId, ApplicationStatus};
use super::reference::ReferenceNumber;
use super::roles::AdminUser;

/// Partial update applied to a stored application. `None` leaves the field
/// untouched; `updated_at` is always written.
#[derive(Debug, Clone)]
pub struct ApplicationPatch {
    pub status: Option<ApplicationStatus>,
    pub reference_number: Option<ReferenceNumber>,
    pub data: Option<ApplicationData>,
    pub updated_at: DateTime<Utc>,
}

/// Storage abstraction so the rule engines can be exercised in isolation.
///
/// `insert` enforces the open-application rule itself: at most one
/// application per `(user_id, service)` may sit in a status that blocks new
/// submissions. Callers pre-check with the limits service for friendlier
/// messages, but the store is the arbiter under concurrency.
///
/// Listing order from `for_user` and `all` is implementation defined; the
/// in-memory stores return insertion order.
pub trait ApplicationStore: Send + Sync {
    fn insert(&self, application: Application) -> Result<Application, StoreError>;
    fn update(&self, id: &ApplicationId, patch: ApplicationPatch) -> Result<Application, StoreError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    fn for_user(&self, user_id: &str) -> Result<Vec<Application>, StoreError>;
    fn all(&self) -> Result<Vec<Application>, StoreError>;
    fn delete(&self, id: &ApplicationId) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("application already exists")]
    Conflict,
    #[error("application not found")]
    NotFound,
    #[error("user already has an open {service} application ({existing_id})")]
    OpenApplicationExists {
        service: &'static str,
        existing_id: ApplicationId,
    },
    #[error("application store unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of staff accounts by identifier.
pub trait AdminDirectory: Send + Sync {
    fn fetch_admin(&self, admin_id: &str) -> Result<Option<AdminUser>, StoreError>;
}

/// Outbound decision notices (SMS and e-mail adapters in production).
pub trait DecisionNotifier: Send + Sync {
    fn notify(&self, notice: DecisionNotice) -> Result<(), NotifyError>;
}

/// Payload handed to notification adapters once a decision has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionNotice {
    pub template: String,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

/// Notice dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
