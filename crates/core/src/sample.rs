//! Sample and order context.
//!
//! A [`Sample`] is the physical specimen tracked from phlebotomy through reception to the
//! bench. Its [`SampleStatus`] only moves forward along the pipeline, except that a sample
//! may be rejected at any point before testing starts.

use crate::{LimsError, LimsResult};
use lims_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Stat,
    Urgent,
    Normal,
}

/// Lifecycle of a sample, in pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleStatus {
    PendingCollection,
    Collected,
    InTransit,
    ReceivedAtLab,
    QualityCheck,
    Accepted,
    Rejected,
    InTesting,
    ResultEntered,
    SentForVerification,
    Verified,
    Authorized,
    Dispatched,
}

impl SampleStatus {
    const PIPELINE: [SampleStatus; 12] = [
        SampleStatus::PendingCollection,
        SampleStatus::Collected,
        SampleStatus::InTransit,
        SampleStatus::ReceivedAtLab,
        SampleStatus::QualityCheck,
        SampleStatus::Accepted,
        SampleStatus::InTesting,
        SampleStatus::ResultEntered,
        SampleStatus::SentForVerification,
        SampleStatus::Verified,
        SampleStatus::Authorized,
        SampleStatus::Dispatched,
    ];

    fn pipeline_index(self) -> Option<usize> {
        Self::PIPELINE.iter().position(|s| *s == self)
    }

    /// Rejection is possible until the sample has been accepted for testing.
    pub fn is_pre_analytical(self) -> bool {
        matches!(
            self,
            SampleStatus::PendingCollection
                | SampleStatus::Collected
                | SampleStatus::InTransit
                | SampleStatus::ReceivedAtLab
                | SampleStatus::QualityCheck
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SampleStatus::Rejected | SampleStatus::Dispatched)
    }

    /// Whether `next` is the immediate successor of `self`, or a rejection of a
    /// pre-analytical sample.
    pub fn can_transition_to(self, next: SampleStatus) -> bool {
        if next == SampleStatus::Rejected {
            return self.is_pre_analytical();
        }
        match (self.pipeline_index(), next.pipeline_index()) {
            (Some(from), Some(to)) => to == from + 1,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SampleStatus::PendingCollection => "PENDING_COLLECTION",
            SampleStatus::Collected => "COLLECTED",
            SampleStatus::InTransit => "IN_TRANSIT",
            SampleStatus::ReceivedAtLab => "RECEIVED_AT_LAB",
            SampleStatus::QualityCheck => "QUALITY_CHECK",
            SampleStatus::Accepted => "ACCEPTED",
            SampleStatus::Rejected => "REJECTED",
            SampleStatus::InTesting => "IN_TESTING",
            SampleStatus::ResultEntered => "RESULT_ENTERED",
            SampleStatus::SentForVerification => "SENT_FOR_VERIFICATION",
            SampleStatus::Verified => "VERIFIED",
            SampleStatus::Authorized => "AUTHORIZED",
            SampleStatus::Dispatched => "DISPATCHED",
        }
    }
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TubeType {
    EdtaPurple,
    EdtaLavender,
    SstGold,
    SstRed,
    CitrateBlue,
    HeparinGreen,
    UrineYellow,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Hospital patient identifier, e.g. `DH-982384`.
    pub pid: NonEmptyText,
    pub name: NonEmptyText,
    pub age: u16,
    pub gender: Gender,
    #[serde(default)]
    pub ward_room: Option<String>,
    #[serde(default)]
    pub mrn: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub sample_id: NonEmptyText,
    pub order_id: NonEmptyText,
    pub patient: Patient,
    pub test_type: String,
    /// Ordered test codes, e.g. `["FBC", "CRP"]`.
    pub test_codes: Vec<String>,
    pub priority: Priority,
    pub tube_types: Vec<TubeType>,
    /// Bench department the sample is routed to, once known.
    #[serde(default)]
    pub department: Option<String>,
    status: SampleStatus,
}

impl Sample {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sample_id: NonEmptyText,
        order_id: NonEmptyText,
        patient: Patient,
        test_type: impl Into<String>,
        test_codes: Vec<String>,
        priority: Priority,
        tube_types: Vec<TubeType>,
        status: SampleStatus,
    ) -> Self {
        Self {
            sample_id,
            order_id,
            patient,
            test_type: test_type.into(),
            test_codes,
            priority,
            tube_types,
            department: None,
            status,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn status(&self) -> SampleStatus {
        self.status
    }

    /// Move the sample to `next`.
    ///
    /// # Errors
    ///
    /// Returns `LimsError::InvalidTransition` if `next` does not follow the current status.
    pub fn advance(&mut self, next: SampleStatus) -> LimsResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(LimsError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        tracing::info!(
            sample_id = %self.sample_id,
            from = %self.status,
            to = %next,
            "sample status changed"
        );
        self.status = next;
        Ok(())
    }
}
