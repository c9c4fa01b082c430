use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::OnboardingConfig;

use super::domain::{DocumentStep, EmployeeId, ReviewDecision, StepDocument, VisaRecord};
use super::progression::{self, ReviewRejected, UploadRejected};
use super::repository::{
    EmployeeProgressView, NotificationError, OnboardingRoster, RepositoryError, ReviewNotice,
    ReviewNotifier, VisaRecordRepository, VisaStatusView,
};

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_HR_SENDER: &str = "hr-onboarding@example.com";

/// Policy dials for document intake and review notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPolicy {
    pub max_upload_bytes: u64,
    pub notification_sender: String,
}

impl Default for DocumentPolicy {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            notification_sender: DEFAULT_HR_SENDER.to_string(),
        }
    }
}

impl From<&OnboardingConfig> for DocumentPolicy {
    fn from(config: &OnboardingConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            notification_sender: config.hr_sender.clone(),
        }
    }
}

/// Inbound descriptor for a document blob the storage collaborator has
/// already persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub url: String,
}

/// Intake validation failures, raised before the progression engine runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown visa step '{0}'")]
    UnknownStep(String),
    #[error("document must be a PDF (received {received})")]
    UnsupportedContentType { received: String },
    #[error("document is {size_bytes} bytes which exceeds the {limit_bytes} byte limit")]
    DocumentTooLarge { size_bytes: u64, limit_bytes: u64 },
}

/// Service composing the progression engine with a record repository and a
/// review notifier. All upload and review traffic funnels through here so the
/// gating rules are enforced exactly once, server-side.
pub struct VisaDocumentService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    policy: DocumentPolicy,
}

impl<R, N> VisaDocumentService<R, N>
where
    R: VisaRecordRepository + 'static,
    N: ReviewNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, policy: DocumentPolicy) -> Self {
        Self {
            repository,
            notifier,
            policy,
        }
    }

    /// Accept a document submission for `step`. Creates the visa record when
    /// the first OPT Receipt arrives; any other step requires an existing
    /// record. Persistence is conditional on the status observed during the
    /// permission check, so a racing writer loses cleanly instead of
    /// clobbering.
    pub fn upload(
        &self,
        employee_id: EmployeeId,
        step: DocumentStep,
        upload: DocumentUpload,
    ) -> Result<VisaStatusView, VisaServiceError> {
        self.validate(&upload)?;

        let document = StepDocument {
            url: upload.url,
            uploaded_at: Utc::now(),
        };

        let stored = match self.repository.fetch(&employee_id)? {
            Some(existing) => {
                let observed = existing.step(step).status;
                let mut working = existing;
                progression::apply_upload(&mut working, step, document)?;
                self.repository
                    .update_step(&employee_id, step, observed, working.step(step).clone())?
            }
            None if step == DocumentStep::OptReceipt => {
                let mut fresh = VisaRecord::fresh(employee_id.clone());
                progression::apply_upload(&mut fresh, step, document)?;
                self.repository.insert(fresh)?
            }
            None => return Err(UploadRejected::MissingRecord.into()),
        };

        info!(
            employee = %stored.employee_id.0,
            step = step.key(),
            file = %upload.file_name,
            "visa document submitted"
        );
        Ok(VisaStatusView::from_record(&stored))
    }

    /// Record an HR decision for a pending submission and notify the
    /// employee of the outcome and their next action.
    pub fn review(
        &self,
        employee_id: EmployeeId,
        step: DocumentStep,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> Result<VisaStatusView, VisaServiceError> {
        let existing = self
            .repository
            .fetch(&employee_id)?
            .ok_or(RepositoryError::NotFound)?;

        let observed = existing.step(step).status;
        let mut working = existing;
        progression::apply_review(&mut working, step, decision, feedback)?;
        let stored =
            self.repository
                .update_step(&employee_id, step, observed, working.step(step).clone())?;

        self.notifier.notify(ReviewNotice {
            sender: self.policy.notification_sender.clone(),
            employee_id: stored.employee_id.clone(),
            step,
            decision,
            feedback: stored.step(step).feedback.clone(),
            next_action: progression::next_action(&stored),
        })?;

        info!(
            employee = %stored.employee_id.0,
            step = step.key(),
            decision = decision.label(),
            "visa document reviewed"
        );
        Ok(VisaStatusView::from_record(&stored))
    }

    /// Current progression snapshot. An employee with no record yet gets the
    /// record-absent permission view rather than an error.
    pub fn status(&self, employee_id: &EmployeeId) -> Result<VisaStatusView, VisaServiceError> {
        match self.repository.fetch(employee_id)? {
            Some(record) => Ok(VisaStatusView::from_record(&record)),
            None => Ok(VisaStatusView::missing(employee_id.clone())),
        }
    }

    pub fn progress(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<EmployeeProgressView, VisaServiceError> {
        let record = self
            .repository
            .fetch(employee_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(EmployeeProgressView::from_record(&record))
    }

    /// Every tracked employee, split into in-progress and complete for the
    /// HR dashboard.
    pub fn roster(&self) -> Result<OnboardingRoster, VisaServiceError> {
        let mut roster = OnboardingRoster::default();
        for record in self.repository.list()? {
            let view = EmployeeProgressView::from_record(&record);
            if view.complete {
                roster.complete.push(view);
            } else {
                roster.in_progress.push(view);
            }
        }
        Ok(roster)
    }

    fn validate(&self, upload: &DocumentUpload) -> Result<(), ValidationError> {
        let parsed = upload.content_type.parse::<mime::Mime>().map_err(|_| {
            ValidationError::UnsupportedContentType {
                received: upload.content_type.clone(),
            }
        })?;
        if parsed.essence_str() != mime::APPLICATION_PDF.essence_str() {
            return Err(ValidationError::UnsupportedContentType {
                received: upload.content_type.clone(),
            });
        }

        if upload.size_bytes > self.policy.max_upload_bytes {
            return Err(ValidationError::DocumentTooLarge {
                size_bytes: upload.size_bytes,
                limit_bytes: self.policy.max_upload_bytes,
            });
        }

        Ok(())
    }
}

/// Error raised by the document service.
#[derive(Debug, thiserror::Error)]
pub enum VisaServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upload(#[from] UploadRejected),
    #[error(transparent)]
    Review(#[from] ReviewRejected),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}
