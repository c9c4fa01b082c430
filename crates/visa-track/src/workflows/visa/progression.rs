//! The step progression engine: pure functions over a [`VisaRecord`] that
//! decide which checkpoint is actionable and whether an upload or review may
//! proceed. Both the employee-facing permission map and the server-side
//! mutation gates evaluate the same rules, so the two can never drift.

use serde::Serialize;
use std::fmt;

use super::domain::{DocumentStep, ReviewDecision, StepDocument, StepState, StepStatus, VisaRecord};

pub const REASON_READY: &str = "Ready to upload";
pub const REASON_PENDING: &str = "Waiting for HR review";
pub const REASON_APPROVED: &str = "Document already approved";
pub const REASON_REJECTED: &str = "Previous submission was rejected. You can re-upload.";
pub const REASON_BLOCKED: &str = "Previous step must be approved first";
pub const REASON_NO_RECORD: &str = "Complete OPT Receipt first";

/// Shown in place of reviewer feedback when a rejection carried none.
pub const FEEDBACK_PLACEHOLDER: &str = "No additional feedback provided.";

/// The engine's verdict on whether one step may currently accept an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepPermission {
    pub step: DocumentStep,
    pub status: StepStatus,
    pub can_upload: bool,
    pub reason: &'static str,
    pub ui_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<StepDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Earliest step not yet approved; `None` once all four are approved.
pub fn current_step(record: &VisaRecord) -> Option<DocumentStep> {
    DocumentStep::SEQUENCE
        .into_iter()
        .find(|step| record.step(*step).status != StepStatus::Approved)
}

/// Human-readable description of the next action, short-circuiting at the
/// first unresolved step.
pub fn next_action(record: &VisaRecord) -> String {
    match current_step(record) {
        None => "Complete".to_string(),
        Some(step) => match record.step(step).status {
            StepStatus::Pending => format!("{} needs review", step.label()),
            _ => format!("Wait to submit {}", step.label()),
        },
    }
}

fn upload_violation(record: &VisaRecord, step: DocumentStep) -> Option<UploadRejected> {
    if let Some(previous) = step.predecessor() {
        if record.step(previous).status != StepStatus::Approved {
            return Some(UploadRejected::PredecessorNotApproved);
        }
    }

    match record.step(step).status {
        StepStatus::Pending => Some(UploadRejected::PendingReview),
        StepStatus::Approved => Some(UploadRejected::AlreadyApproved),
        StepStatus::NotUploaded | StepStatus::Rejected => None,
    }
}

/// Evaluate whether `step` may accept an upload right now. Rule order: an
/// unapproved predecessor blocks regardless of the step's own status; the
/// first step has no predecessor gate.
pub fn upload_permission(record: &VisaRecord, step: DocumentStep) -> StepPermission {
    let state = record.step(step);

    if let Some(previous) = step.predecessor() {
        if record.step(previous).status != StepStatus::Approved {
            return StepPermission {
                step,
                status: state.status,
                can_upload: false,
                reason: REASON_BLOCKED,
                ui_message: format!(
                    "{} must be approved before {} can be submitted.",
                    previous.label(),
                    step.label()
                ),
                document: state.document.clone(),
                feedback: None,
            };
        }
    }

    match state.status {
        StepStatus::NotUploaded => StepPermission {
            step,
            status: state.status,
            can_upload: true,
            reason: REASON_READY,
            ui_message: format!("Please upload your {}.", step.label()),
            document: None,
            feedback: None,
        },
        StepStatus::Pending => StepPermission {
            step,
            status: state.status,
            can_upload: false,
            reason: REASON_PENDING,
            ui_message: format!("{} is already pending HR review.", step.label()),
            document: state.document.clone(),
            feedback: None,
        },
        StepStatus::Approved => StepPermission {
            step,
            status: state.status,
            can_upload: false,
            reason: REASON_APPROVED,
            ui_message: format!("{} has been approved.", step.label()),
            document: state.document.clone(),
            feedback: None,
        },
        StepStatus::Rejected => StepPermission {
            step,
            status: state.status,
            can_upload: true,
            reason: REASON_REJECTED,
            ui_message: format!(
                "{} was rejected. Review the feedback and upload a new document.",
                step.label()
            ),
            document: state.document.clone(),
            feedback: Some(
                state
                    .feedback
                    .clone()
                    .filter(|feedback| !feedback.is_empty())
                    .unwrap_or_else(|| FEEDBACK_PLACEHOLDER.to_string()),
            ),
        },
    }
}

/// Permission verdicts for all four steps, in sequence order. Each step is
/// evaluated independently through [`upload_permission`].
pub fn permission_map(record: &VisaRecord) -> Vec<StepPermission> {
    DocumentStep::SEQUENCE
        .into_iter()
        .map(|step| upload_permission(record, step))
        .collect()
}

/// Permission verdicts for an employee with no visa record yet: the first
/// step is open, everything later waits on the OPT Receipt.
pub fn missing_record_permissions() -> Vec<StepPermission> {
    DocumentStep::SEQUENCE
        .into_iter()
        .map(|step| {
            if step == DocumentStep::OptReceipt {
                StepPermission {
                    step,
                    status: StepStatus::NotUploaded,
                    can_upload: true,
                    reason: REASON_READY,
                    ui_message: format!("Please upload your {}.", step.label()),
                    document: None,
                    feedback: None,
                }
            } else {
                StepPermission {
                    step,
                    status: StepStatus::NotUploaded,
                    can_upload: false,
                    reason: REASON_NO_RECORD,
                    ui_message: format!(
                        "Complete OPT Receipt before submitting {}.",
                        step.label()
                    ),
                    document: None,
                    feedback: None,
                }
            }
        })
        .collect()
}

/// Record a fresh submission for `step`. The permission rules are evaluated
/// here again; a caller-computed verdict is never trusted. On success the
/// step becomes pending with the new document and any stale feedback cleared;
/// no other step changes.
pub fn apply_upload(
    record: &mut VisaRecord,
    step: DocumentStep,
    document: StepDocument,
) -> Result<(), UploadRejected> {
    if let Some(violation) = upload_violation(record, step) {
        return Err(violation);
    }

    *record.step_mut(step) = StepState::pending(document);
    Ok(())
}

/// Record an HR decision for `step`. Only pending submissions are reviewable:
/// a never-submitted step has nothing to review, and approved/rejected steps
/// are resolved until the employee re-uploads.
pub fn apply_review(
    record: &mut VisaRecord,
    step: DocumentStep,
    decision: ReviewDecision,
    feedback: Option<String>,
) -> Result<(), ReviewRejected> {
    let state = record.step_mut(step);
    match state.status {
        StepStatus::Pending => {
            state.status = decision.status();
            state.feedback = Some(feedback.unwrap_or_default());
            Ok(())
        }
        StepStatus::NotUploaded => Err(ReviewRejected::NotSubmitted),
        status => Err(ReviewRejected::AlreadyResolved { status }),
    }
}

/// Upload refusal. The display text is exactly the reason text of the
/// corresponding permission verdict, so callers can render either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRejected {
    PredecessorNotApproved,
    PendingReview,
    AlreadyApproved,
    MissingRecord,
}

impl UploadRejected {
    pub const fn reason(self) -> &'static str {
        match self {
            Self::PredecessorNotApproved => REASON_BLOCKED,
            Self::PendingReview => REASON_PENDING,
            Self::AlreadyApproved => REASON_APPROVED,
            Self::MissingRecord => "you must upload the OPT receipt first",
        }
    }
}

impl fmt::Display for UploadRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl std::error::Error for UploadRejected {}

/// Review refusal for steps outside the pending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReviewRejected {
    #[error("no document has been submitted for this step")]
    NotSubmitted,
    #[error("step is already {status}")]
    AlreadyResolved { status: StepStatus },
}
