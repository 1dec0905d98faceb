//! Pre-analytical verification at reception.
//!
//! Before a sample is queued for analysis the receiving officer works through a checklist of
//! physical checks. Acceptance requires every required check; optional checks are recorded
//! but never block. A sample that fails verification is rejected with a categorised reason.

use crate::{LimsError, LimsResult};
use lims_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub id: String,
    pub label: String,
    pub description: String,
    pub required: bool,
    pub checked: bool,
}

impl VerificationCheck {
    fn new(id: &str, label: &str, description: &str, required: bool) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            required,
            checked: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChecklist {
    checks: Vec<VerificationCheck>,
}

impl VerificationChecklist {
    pub fn new(checks: Vec<VerificationCheck>) -> Self {
        Self { checks }
    }

    /// The reception checklist used for blood samples.
    pub fn standard() -> Self {
        Self::new(vec![
            VerificationCheck::new(
                "barcode",
                "Barcode Integrity",
                "Label is unscratched, properly aligned, and readable by scanner.",
                true,
            ),
            VerificationCheck::new(
                "container",
                "Correct Container",
                "Verified against test requirements.",
                true,
            ),
            VerificationCheck::new(
                "volume",
                "Volume Sufficiency",
                "Actual volume meets the minimum required for the ordered tests.",
                false,
            ),
            VerificationCheck::new(
                "condition",
                "Sample Condition",
                "Visual check: no hemolysis, no clots, no lipemia observed.",
                true,
            ),
            VerificationCheck::new(
                "window",
                "Collection Window",
                "Received within established stability timeframe.",
                true,
            ),
        ])
    }

    pub fn checks(&self) -> &[VerificationCheck] {
        &self.checks
    }

    pub fn set_checked(&mut self, id: &str, checked: bool) -> LimsResult<()> {
        let check = self
            .checks
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| LimsError::UnknownCheck(id.to_string()))?;
        check.checked = checked;
        Ok(())
    }

    pub fn checked_count(&self) -> usize {
        self.checks.iter().filter(|c| c.checked).count()
    }

    pub fn outstanding_required(&self) -> impl Iterator<Item = &VerificationCheck> {
        self.checks.iter().filter(|c| c.required && !c.checked)
    }

    pub fn all_required_checked(&self) -> bool {
        self.outstanding_required().next().is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceDecision {
    pub allowed: bool,
    /// Label of the first required check still outstanding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outstanding: Option<String>,
}

pub fn evaluate_acceptance(checklist: &VerificationChecklist) -> AcceptanceDecision {
    match checklist.outstanding_required().next() {
        Some(check) => AcceptanceDecision {
            allowed: false,
            outstanding: Some(check.label.clone()),
        },
        None => AcceptanceDecision {
            allowed: true,
            outstanding: None,
        },
    }
}

/// Accept a sample, failing with `AcceptanceRejected` while required checks are open.
pub fn accept(sample_id: &NonEmptyText, checklist: &VerificationChecklist) -> LimsResult<()> {
    let decision = evaluate_acceptance(checklist);
    match decision.outstanding {
        Some(label) => Err(LimsError::AcceptanceRejected(label)),
        None => {
            tracing::info!(
                sample_id = %sample_id,
                checked = checklist.checked_count(),
                "sample accepted and queued for analysis"
            );
            Ok(())
        }
    }
}

/// Reception rejection reasons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCategory {
    LabelingError,
    InsufficientVolume,
    Hemolyzed,
    Clotted,
    WrongTubeType,
    LeakedOrContaminated,
    StabilityExceeded,
    IncorrectPatientDetails,
    MissingRequisition,
    Other,
}

impl fmt::Display for RejectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RejectionCategory::LabelingError => "Labeling Error / Misidentified",
            RejectionCategory::InsufficientVolume => "Insufficient Sample Volume",
            RejectionCategory::Hemolyzed => "Hemolyzed Sample",
            RejectionCategory::Clotted => "Clotted Sample",
            RejectionCategory::WrongTubeType => "Wrong Tube Type Used",
            RejectionCategory::LeakedOrContaminated => "Sample Leaked / Contaminated",
            RejectionCategory::StabilityExceeded => "Collection Time Exceeded Stability",
            RejectionCategory::IncorrectPatientDetails => "Incorrect Patient Details",
            RejectionCategory::MissingRequisition => "Missing Requisition Form",
            RejectionCategory::Other => "Other",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRejection {
    pub sample_id: NonEmptyText,
    pub category: RejectionCategory,
    pub comments: Option<String>,
    pub notify_phlebotomy: bool,
    pub request_recollection: bool,
}

impl SampleRejection {
    /// `Other` needs a comment explaining the reason.
    pub fn new(
        sample_id: NonEmptyText,
        category: RejectionCategory,
        comments: Option<String>,
        notify_phlebotomy: bool,
        request_recollection: bool,
    ) -> LimsResult<Self> {
        let comments = comments
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        if category == RejectionCategory::Other && comments.is_none() {
            return Err(LimsError::InvalidInput(
                "comments are required when the rejection reason is Other".into(),
            ));
        }

        Ok(Self {
            sample_id,
            category,
            comments,
            notify_phlebotomy,
            request_recollection,
        })
    }
}
