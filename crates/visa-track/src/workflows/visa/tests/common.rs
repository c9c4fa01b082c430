use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::workflows::visa::domain::{
    DocumentStep, EmployeeId, StepDocument, StepState, StepStatus, VisaRecord,
};
use crate::workflows::visa::repository::{
    NotificationError, RepositoryError, ReviewNotice, ReviewNotifier, VisaRecordRepository,
};
use crate::workflows::visa::router::visa_router;
use crate::workflows::visa::service::{DocumentPolicy, DocumentUpload, VisaDocumentService};

pub(super) fn employee(id: &str) -> EmployeeId {
    EmployeeId(id.to_string())
}

pub(super) fn document(name: &str) -> StepDocument {
    StepDocument {
        url: format!("s3://onboarding-docs/{name}"),
        uploaded_at: Utc
            .with_ymd_and_hms(2026, 3, 14, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub(super) fn pdf_upload(name: &str) -> DocumentUpload {
    DocumentUpload {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        size_bytes: 128 * 1024,
        url: format!("s3://onboarding-docs/{name}"),
    }
}

/// Build a record whose four steps carry the given statuses in sequence
/// order. Steps that have left `NotUploaded` get a document attached.
pub(super) fn record_with(id: &str, statuses: [StepStatus; 4]) -> VisaRecord {
    let mut record = VisaRecord::fresh(employee(id));
    for (step, status) in DocumentStep::SEQUENCE.into_iter().zip(statuses) {
        let state = record.step_mut(step);
        state.status = status;
        if status != StepStatus::NotUploaded {
            state.document = Some(document(step.key()));
        }
    }
    record
}

pub(super) fn default_policy() -> DocumentPolicy {
    DocumentPolicy::default()
}

pub(super) fn build_service() -> (
    VisaDocumentService<MemoryVisaRepository, RecordingNotifier>,
    Arc<MemoryVisaRepository>,
    Arc<RecordingNotifier>,
) {
    let repository = Arc::new(MemoryVisaRepository::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = VisaDocumentService::new(repository.clone(), notifier.clone(), default_policy());
    (service, repository, notifier)
}

pub(super) fn router_with_service(
    service: VisaDocumentService<MemoryVisaRepository, RecordingNotifier>,
) -> axum::Router {
    visa_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryVisaRepository {
    pub(super) records: Arc<Mutex<BTreeMap<EmployeeId, VisaRecord>>>,
}

impl MemoryVisaRepository {
    pub(super) fn seed(&self, record: VisaRecord) {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(record.employee_id.clone(), record);
    }
}

impl VisaRecordRepository for MemoryVisaRepository {
    fn insert(&self, record: VisaRecord) -> Result<VisaRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.employee_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.employee_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &EmployeeId) -> Result<Option<VisaRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_step(
        &self,
        id: &EmployeeId,
        step: DocumentStep,
        expected: StepStatus,
        next: StepState,
    ) -> Result<VisaRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let found = record.step(step).status;
        if found != expected {
            return Err(RepositoryError::StaleStatus { expected, found });
        }
        *record.step_mut(step) = next;
        Ok(record.clone())
    }

    fn list(&self) -> Result<Vec<VisaRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    notices: Arc<Mutex<Vec<ReviewNotice>>>,
}

impl RecordingNotifier {
    pub(super) fn notices(&self) -> Vec<ReviewNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ReviewNotifier for RecordingNotifier {
    fn notify(&self, notice: ReviewNotice) -> Result<(), NotificationError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

/// Simulates a writer that always loses the compare-and-set race: reads see
/// the seeded record, conditional writes report a stale status.
pub(super) struct RacingRepository {
    pub(super) snapshot: VisaRecord,
}

impl VisaRecordRepository for RacingRepository {
    fn insert(&self, _record: VisaRecord) -> Result<VisaRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _id: &EmployeeId) -> Result<Option<VisaRecord>, RepositoryError> {
        Ok(Some(self.snapshot.clone()))
    }

    fn update_step(
        &self,
        _id: &EmployeeId,
        _step: DocumentStep,
        expected: StepStatus,
        _next: StepState,
    ) -> Result<VisaRecord, RepositoryError> {
        Err(RepositoryError::StaleStatus {
            expected,
            found: StepStatus::Pending,
        })
    }

    fn list(&self) -> Result<Vec<VisaRecord>, RepositoryError> {
        Ok(vec![self.snapshot.clone()])
    }
}

pub(super) struct UnavailableRepository;

impl VisaRecordRepository for UnavailableRepository {
    fn insert(&self, _record: VisaRecord) -> Result<VisaRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &EmployeeId) -> Result<Option<VisaRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_step(
        &self,
        _id: &EmployeeId,
        _step: DocumentStep,
        _expected: StepStatus,
        _next: StepState,
    ) -> Result<VisaRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<VisaRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct FailingNotifier;

impl ReviewNotifier for FailingNotifier {
    fn notify(&self, _notice: ReviewNotice) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp down".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
