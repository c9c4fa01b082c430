use serde::{Deserialize, Serialize};

use super::domain::{DocumentStep, EmployeeId, ReviewDecision, StepState, StepStatus, VisaRecord};
use super::progression::{self, StepPermission};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// `update_step` is conditional: the write only lands while the stored status
/// for that step still equals `expected`, which gives the service
/// read-modify-write atomicity on a single record without cross-record
/// coordination.
pub trait VisaRecordRepository: Send + Sync {
    fn insert(&self, record: VisaRecord) -> Result<VisaRecord, RepositoryError>;
    fn fetch(&self, id: &EmployeeId) -> Result<Option<VisaRecord>, RepositoryError>;
    fn update_step(
        &self,
        id: &EmployeeId,
        step: DocumentStep,
        expected: StepStatus,
        next: StepState,
    ) -> Result<VisaRecord, RepositoryError>;
    fn list(&self) -> Result<Vec<VisaRecord>, RepositoryError>;
}

/// Error enumeration for repository failures. `StaleStatus` reports a lost
/// compare-and-set race; `Unavailable` covers infrastructure faults and stays
/// distinct from workflow rule violations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("step status changed concurrently (expected {expected}, found {found})")]
    StaleStatus {
        expected: StepStatus,
        found: StepStatus,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for review-decision notifications (e-mail adapters and the
/// like implement this).
pub trait ReviewNotifier: Send + Sync {
    fn notify(&self, notice: ReviewNotice) -> Result<(), NotificationError>;
}

/// Payload published after every recorded HR decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewNotice {
    pub sender: String,
    pub employee_id: EmployeeId,
    pub step: DocumentStep,
    pub decision: ReviewDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub next_action: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Full per-employee progression snapshot for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct VisaStatusView {
    pub employee_id: EmployeeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<DocumentStep>,
    pub next_action: String,
    pub steps: Vec<StepPermission>,
}

impl VisaStatusView {
    pub fn from_record(record: &VisaRecord) -> Self {
        Self {
            employee_id: record.employee_id.clone(),
            current_step: progression::current_step(record),
            next_action: progression::next_action(record),
            steps: progression::permission_map(record),
        }
    }

    /// View for an employee with no record yet: same shape, record-absent
    /// permission wording.
    pub fn missing(employee_id: EmployeeId) -> Self {
        let placeholder = VisaRecord::fresh(employee_id);
        Self {
            current_step: progression::current_step(&placeholder),
            next_action: progression::next_action(&placeholder),
            steps: progression::missing_record_permissions(),
            employee_id: placeholder.employee_id,
        }
    }
}

/// Roster row used by the HR dashboard to classify onboarding employees.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeProgressView {
    pub employee_id: EmployeeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<DocumentStep>,
    pub next_action: String,
    pub complete: bool,
}

impl EmployeeProgressView {
    pub fn from_record(record: &VisaRecord) -> Self {
        let current_step = progression::current_step(record);
        Self {
            employee_id: record.employee_id.clone(),
            complete: current_step.is_none(),
            next_action: progression::next_action(record),
            current_step,
        }
    }
}

/// All tracked employees split by completion state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OnboardingRoster {
    pub in_progress: Vec<EmployeeProgressView>,
    pub complete: Vec<EmployeeProgressView>,
}
