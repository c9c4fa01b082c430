use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use visa_track::workflows::visa::{
    DocumentStep, EmployeeId, NotificationError, RepositoryError, ReviewNotice, ReviewNotifier,
    StepState, StepStatus, VisaRecord, VisaRecordRepository,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Single-process repository backing the service binary and the demo. The
/// conditional `update_step` gives the same lost-update protection a
/// database-backed implementation would provide with a compare-and-set
/// query.
#[derive(Default, Clone)]
pub(crate) struct InMemoryVisaRepository {
    records: Arc<Mutex<BTreeMap<EmployeeId, VisaRecord>>>,
}

impl VisaRecordRepository for InMemoryVisaRepository {
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

/// Collects review notices instead of delivering mail; the demo prints them
/// and tests assert on them.
#[derive(Default, Clone)]
pub(crate) struct InMemoryReviewNotifier {
    notices: Arc<Mutex<Vec<ReviewNotice>>>,
}

impl InMemoryReviewNotifier {
    pub(crate) fn notices(&self) -> Vec<ReviewNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl ReviewNotifier for InMemoryReviewNotifier {
    fn notify(&self, notice: ReviewNotice) -> Result<(), NotificationError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}
