//! Integration specifications for the visa document progression workflow.
//!
//! Scenarios run end-to-end through the public service facade and HTTP router
//! so upload gating, review, and roster classification are validated without
//! reaching into private modules.

mod common {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use visa_track::workflows::visa::{
        DocumentPolicy, DocumentStep, DocumentUpload, EmployeeId, NotificationError,
        RepositoryError, ReviewNotice, ReviewNotifier, StepState, StepStatus, VisaDocumentService,
        VisaRecord, VisaRecordRepository,
    };

    pub(super) fn employee(id: &str) -> EmployeeId {
        EmployeeId(id.to_string())
    }

    pub(super) fn pdf_upload(name: &str) -> DocumentUpload {
        DocumentUpload {
            file_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 96 * 1024,
            url: format!("s3://onboarding-docs/{name}"),
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryVisaRepository {
        records: Arc<Mutex<BTreeMap<EmployeeId, VisaRecord>>>,
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
    pub(super) struct MemoryNotifier {
        notices: Arc<Mutex<Vec<ReviewNotice>>>,
    }

    impl MemoryNotifier {
        pub(super) fn notices(&self) -> Vec<ReviewNotice> {
            self.notices.lock().expect("notifier mutex poisoned").clone()
        }
    }

    impl ReviewNotifier for MemoryNotifier {
        fn notify(&self, notice: ReviewNotice) -> Result<(), NotificationError> {
            self.notices
                .lock()
                .expect("notifier mutex poisoned")
                .push(notice);
            Ok(())
        }
    }

    pub(super) fn build_service() -> (
        Arc<VisaDocumentService<MemoryVisaRepository, MemoryNotifier>>,
        Arc<MemoryVisaRepository>,
        Arc<MemoryNotifier>,
    ) {
        let repository = Arc::new(MemoryVisaRepository::default());
        let notifier = Arc::new(MemoryNotifier::default());
        let service = Arc::new(VisaDocumentService::new(
            repository.clone(),
            notifier.clone(),
            DocumentPolicy::default(),
        ));
        (service, repository, notifier)
    }
}

use common::*;
use serde_json::json;
use tower::ServiceExt;
use visa_track::workflows::visa::{
    visa_router, DocumentStep, ReviewDecision, StepStatus, UploadRejected, VisaRecordRepository,
    VisaServiceError,
};

#[test]
fn onboarding_walks_all_four_steps_to_completion() {
    let (service, repository, notifier) = build_service();
    let id = employee("emp-0001");

    for step in DocumentStep::SEQUENCE {
        let view = service
            .upload(id.clone(), step, pdf_upload(&format!("{}.pdf", step.key())))
            .expect("unlocked step accepts upload");
        assert_eq!(view.current_step, Some(step));

        let view = service
            .review(id.clone(), step, ReviewDecision::Approved, None)
            .expect("pending step is reviewable");
        assert_ne!(view.current_step, Some(step));
    }

    let progress = service.progress(&id).expect("record exists");
    assert!(progress.complete);
    assert_eq!(progress.next_action, "Complete");

    let stored = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("record present");
    for step in DocumentStep::SEQUENCE {
        assert_eq!(stored.step(step).status, StepStatus::Approved);
    }

    // One notice per review decision, all from the configured sender.
    let notices = notifier.notices();
    assert_eq!(notices.len(), 4);
    assert!(notices
        .iter()
        .all(|notice| notice.sender == "hr-onboarding@example.com"));
}

#[test]
fn skipping_ahead_is_blocked_until_the_predecessor_is_approved() {
    let (service, _, _) = build_service();
    let id = employee("emp-0002");

    match service.upload(id.clone(), DocumentStep::OptEad, pdf_upload("opt-ead.pdf")) {
        Err(VisaServiceError::Upload(UploadRejected::MissingRecord)) => {}
        other => panic!("expected missing-record rejection, got {other:?}"),
    }

    service
        .upload(id.clone(), DocumentStep::OptReceipt, pdf_upload("receipt.pdf"))
        .expect("first step accepts upload");

    match service.upload(id.clone(), DocumentStep::OptEad, pdf_upload("opt-ead.pdf")) {
        Err(VisaServiceError::Upload(UploadRejected::PredecessorNotApproved)) => {}
        other => panic!("expected sequence violation, got {other:?}"),
    }
}

#[test]
fn rejection_loop_resubmits_and_recovers() {
    let (service, _, _) = build_service();
    let id = employee("emp-0003");

    service
        .upload(id.clone(), DocumentStep::OptReceipt, pdf_upload("receipt.pdf"))
        .expect("first step accepts upload");
    let view = service
        .review(
            id.clone(),
            DocumentStep::OptReceipt,
            ReviewDecision::Rejected,
            Some("signature missing".to_string()),
        )
        .expect("pending step is reviewable");

    let receipt = &view.steps[0];
    assert!(receipt.can_upload);
    assert_eq!(receipt.feedback.as_deref(), Some("signature missing"));

    let view = service
        .upload(
            id.clone(),
            DocumentStep::OptReceipt,
            pdf_upload("receipt-v2.pdf"),
        )
        .expect("rejected step accepts a new document");
    assert_eq!(view.steps[0].status, StepStatus::Pending);
    assert_eq!(view.steps[0].feedback, None);
}

#[tokio::test]
async fn http_surface_round_trips_an_upload_and_review() {
    let (service, _, _) = build_service();
    let router = visa_router(service);

    let response = router
        .clone()
        .oneshot(
            axum::http::Request::post("/api/v1/visa/emp-0004/steps/optReceipt/documents")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&pdf_upload("receipt.pdf")).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .expect("upload route executes");
    assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);

    let body = json!({ "decision": "approved" });
    let response = router
        .clone()
        .oneshot(
            axum::http::Request::post("/api/v1/visa/emp-0004/steps/optReceipt/review")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .expect("review route executes");
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/visa/emp-0004")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("status route executes");
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json payload");
    assert_eq!(payload["current_step"], json!("optEAD"));
    assert_eq!(payload["next_action"], json!("Wait to submit OPT EAD"));
}
