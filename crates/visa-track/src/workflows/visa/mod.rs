//! Visa document progression for onboarding employees.
//!
//! Four sequential checkpoints (OPT Receipt, OPT EAD, I-983, I-20) are
//! tracked per employee. The [`progression`] module is the single source of
//! truth for which step is actionable and whether an upload is permitted;
//! employee-facing upload handlers, the HR review surface, and the roster all
//! consume the same verdicts.

pub mod domain;
pub mod progression;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    DocumentStep, EmployeeId, RawStepData, RawVisaRecord, ReviewDecision, StepDocument, StepState,
    StepStatus, VisaRecord,
};
pub use progression::{
    current_step, missing_record_permissions, next_action, permission_map, upload_permission,
    ReviewRejected, StepPermission, UploadRejected,
};
pub use repository::{
    EmployeeProgressView, NotificationError, OnboardingRoster, RepositoryError, ReviewNotice,
    ReviewNotifier, VisaRecordRepository, VisaStatusView,
};
pub use router::visa_router;
pub use service::{
    DocumentPolicy, DocumentUpload, ValidationError, VisaDocumentService, VisaServiceError,
};
