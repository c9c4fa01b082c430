use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for the employee owning a visa record. The employee
/// entity itself lives with the HR system of record; only the back-reference
/// is kept here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

/// The four sequential visa document checkpoints, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentStep {
    #[serde(rename = "optReceipt")]
    OptReceipt,
    #[serde(rename = "optEAD")]
    OptEad,
    #[serde(rename = "i983")]
    I983,
    #[serde(rename = "i20")]
    I20,
}

impl DocumentStep {
    /// Fixed submission order; gating walks this array.
    pub const SEQUENCE: [Self; 4] = [Self::OptReceipt, Self::OptEad, Self::I983, Self::I20];

    pub const fn label(self) -> &'static str {
        match self {
            Self::OptReceipt => "OPT Receipt",
            Self::OptEad => "OPT EAD",
            Self::I983 => "I-983",
            Self::I20 => "I-20",
        }
    }

    /// Wire key used in routes and stored payloads.
    pub const fn key(self) -> &'static str {
        match self {
            Self::OptReceipt => "optReceipt",
            Self::OptEad => "optEAD",
            Self::I983 => "i983",
            Self::I20 => "i20",
        }
    }

    /// The step that must be approved before this one may be submitted.
    pub const fn predecessor(self) -> Option<Self> {
        match self {
            Self::OptReceipt => None,
            Self::OptEad => Some(Self::OptReceipt),
            Self::I983 => Some(Self::OptEad),
            Self::I20 => Some(Self::I983),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::SEQUENCE
            .into_iter()
            .find(|step| step.key().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for DocumentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical per-step status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    NotUploaded,
    Pending,
    Approved,
    Rejected,
}

impl StepStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotUploaded => "not_uploaded",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Canonicalize a raw stored status. Missing values, the legacy
    /// `"not uploaded"` literal, and any unrecognized string all collapse to
    /// [`StepStatus::NotUploaded`]; the three live statuses pass through.
    /// Total over all inputs and idempotent over its own labels.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("pending") => Self::Pending,
            Some("approved") => Self::Approved,
            Some("rejected") => Self::Rejected,
            _ => Self::NotUploaded,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stored document blob reference; the blob itself lives with the storage
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDocument {
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Full state of one checkpoint. `feedback` is meaningful only after a
/// rejection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepState {
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<StepDocument>,
}

impl StepState {
    /// State after a fresh submission: pending review, feedback cleared.
    pub fn pending(document: StepDocument) -> Self {
        Self {
            status: StepStatus::Pending,
            feedback: None,
            document: Some(document),
        }
    }
}

/// One employee's visa paperwork. All four steps are always present; an
/// untouched step reports [`StepStatus::NotUploaded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisaRecord {
    pub employee_id: EmployeeId,
    #[serde(rename = "optReceipt")]
    pub opt_receipt: StepState,
    #[serde(rename = "optEAD")]
    pub opt_ead: StepState,
    pub i983: StepState,
    pub i20: StepState,
}

impl VisaRecord {
    pub fn fresh(employee_id: EmployeeId) -> Self {
        Self {
            employee_id,
            opt_receipt: StepState::default(),
            opt_ead: StepState::default(),
            i983: StepState::default(),
            i20: StepState::default(),
        }
    }

    pub fn step(&self, step: DocumentStep) -> &StepState {
        match step {
            DocumentStep::OptReceipt => &self.opt_receipt,
            DocumentStep::OptEad => &self.opt_ead,
            DocumentStep::I983 => &self.i983,
            DocumentStep::I20 => &self.i20,
        }
    }

    pub fn step_mut(&mut self, step: DocumentStep) -> &mut StepState {
        match step {
            DocumentStep::OptReceipt => &mut self.opt_receipt,
            DocumentStep::OptEad => &mut self.opt_ead,
            DocumentStep::I983 => &mut self.i983,
            DocumentStep::I20 => &mut self.i20,
        }
    }
}

/// Decision an HR reviewer can record for a pending submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub const fn status(self) -> StepStatus {
        match self {
            Self::Approved => StepStatus::Approved,
            Self::Rejected => StepStatus::Rejected,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Storage-facing step shape with a free-form status string, as legacy
/// records persist it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStepData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub document: Option<StepDocument>,
}

impl RawStepData {
    fn into_state(self) -> StepState {
        StepState {
            status: StepStatus::normalize(self.status.as_deref()),
            feedback: self.feedback,
            document: self.document,
        }
    }
}

/// Storage-facing record shape. Steps may be absent entirely; conversion
/// normalizes every status so the engine only ever sees canonical values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVisaRecord {
    pub employee_id: String,
    #[serde(default, rename = "optReceipt")]
    pub opt_receipt: Option<RawStepData>,
    #[serde(default, rename = "optEAD")]
    pub opt_ead: Option<RawStepData>,
    #[serde(default)]
    pub i983: Option<RawStepData>,
    #[serde(default)]
    pub i20: Option<RawStepData>,
}

impl RawVisaRecord {
    pub fn into_record(self) -> VisaRecord {
        fn state(raw: Option<RawStepData>) -> StepState {
            raw.map(RawStepData::into_state).unwrap_or_default()
        }

        VisaRecord {
            employee_id: EmployeeId(self.employee_id),
            opt_receipt: state(self.opt_receipt),
            opt_ead: state(self.opt_ead),
            i983: state(self.i983),
            i20: state(self.i20),
        }
    }
}
