//! Result sets: the parameter results entered for one sample's test order.
//!
//! A [`ResultSet`] is created in `Draft` from upstream order data, edited in place by one
//! operator, and becomes `Submitted` once the submission gate allows it. Flags are never
//! stored; every read derives them from the current raw value, so a flag can never disagree
//! with the value it describes.

use crate::flag::{parse_result_value, ReferenceRange, ResultFlag};
use crate::submission::{evaluate_submission, SubmissionDecision};
use crate::{LimsError, LimsResult};
use chrono::{DateTime, Utc};
use lims_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single analyte measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    /// Unique within its result set, e.g. `k`.
    pub id: NonEmptyText,
    /// Display label, e.g. `Potassium (K+)`.
    pub name: NonEmptyText,
    /// Value as typed by the operator or imported from an instrument.
    pub raw_value: String,
    /// Display unit only.
    pub unit: String,
    pub range: ReferenceRange,
    /// Calculated parameters are shown but cannot be typed into.
    pub editable: bool,
}

impl Parameter {
    pub fn new(
        id: NonEmptyText,
        name: NonEmptyText,
        unit: impl Into<String>,
        range: ReferenceRange,
    ) -> Self {
        Self {
            id,
            name,
            raw_value: String::new(),
            unit: unit.into(),
            range,
            editable: true,
        }
    }

    pub fn with_value(mut self, raw: impl Into<String>) -> Self {
        self.raw_value = raw.into();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Parsed value, `None` when blank or not a number.
    pub fn value(&self) -> Option<f64> {
        parse_result_value(&self.raw_value)
    }

    /// Flag for the current value, `None` when there is no usable value.
    pub fn flag(&self) -> Option<ResultFlag> {
        self.value().map(|v| self.range.classify(v))
    }

    pub fn is_critical(&self) -> bool {
        self.flag().is_some_and(ResultFlag::is_critical)
    }
}

/// A named group of parameters, e.g. `COMPLETE BLOOD COUNT`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterGroup {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

impl ParameterGroup {
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultSetStatus {
    Draft,
    Submitted,
}

/// Counts of derived flags across a result set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSummary {
    pub normal: usize,
    pub low: usize,
    pub high: usize,
    pub critical_low: usize,
    pub critical_high: usize,
    /// Parameters without a usable value.
    pub missing: usize,
}

impl FlagSummary {
    pub fn total(&self) -> usize {
        self.normal + self.low + self.high + self.critical_low + self.critical_high + self.missing
    }

    pub fn critical(&self) -> usize {
        self.critical_low + self.critical_high
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultSet {
    sample_id: NonEmptyText,
    test_type: String,
    groups: Vec<ParameterGroup>,
    notes: String,
    critical_acknowledged: bool,
    status: ResultSetStatus,
    version: u64,
    submitted_at: Option<DateTime<Utc>>,
    submitted_by: Option<NonEmptyText>,
}

impl ResultSet {
    /// Create a draft result set.
    ///
    /// # Errors
    ///
    /// Returns `LimsError::InvalidInput` if two parameters share an id.
    pub fn new(
        sample_id: NonEmptyText,
        test_type: impl Into<String>,
        groups: Vec<ParameterGroup>,
    ) -> LimsResult<Self> {
        let mut seen = HashSet::new();
        for parameter in groups.iter().flat_map(|g| g.parameters.iter()) {
            if !seen.insert(parameter.id.as_str()) {
                return Err(LimsError::InvalidInput(format!(
                    "duplicate parameter id '{}' in result set {}",
                    parameter.id, sample_id
                )));
            }
        }

        Ok(Self {
            sample_id,
            test_type: test_type.into(),
            groups,
            notes: String::new(),
            critical_acknowledged: false,
            status: ResultSetStatus::Draft,
            version: 0,
            submitted_at: None,
            submitted_by: None,
        })
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_critical_acknowledged(mut self, acknowledged: bool) -> Self {
        self.critical_acknowledged = acknowledged;
        self
    }

    pub fn sample_id(&self) -> &NonEmptyText {
        &self.sample_id
    }

    pub fn test_type(&self) -> &str {
        &self.test_type
    }

    pub fn groups(&self) -> &[ParameterGroup] {
        &self.groups
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn critical_acknowledged(&self) -> bool {
        self.critical_acknowledged
    }

    pub fn status(&self) -> ResultSetStatus {
        self.status
    }

    /// Incremented on every mutation; used for optimistic concurrency by stores.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn submitted_by(&self) -> Option<&NonEmptyText> {
        self.submitted_by.as_ref()
    }

    /// All parameters, in group order then parameter order.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.groups.iter().flat_map(|g| g.parameters.iter())
    }

    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters().find(|p| p.id == id)
    }

    pub fn critical_parameters(&self) -> Vec<&Parameter> {
        self.parameters().filter(|p| p.is_critical()).collect()
    }

    pub fn has_critical(&self) -> bool {
        self.parameters().any(Parameter::is_critical)
    }

    pub fn flag_summary(&self) -> FlagSummary {
        let mut summary = FlagSummary::default();
        for parameter in self.parameters() {
            match parameter.flag() {
                None => summary.missing += 1,
                Some(ResultFlag::Normal) => summary.normal += 1,
                Some(ResultFlag::Low) => summary.low += 1,
                Some(ResultFlag::High) => summary.high += 1,
                Some(ResultFlag::CriticalLow) => summary.critical_low += 1,
                Some(ResultFlag::CriticalHigh) => summary.critical_high += 1,
            }
        }
        summary
    }

    fn ensure_draft(&self) -> LimsResult<()> {
        match self.status {
            ResultSetStatus::Draft => Ok(()),
            ResultSetStatus::Submitted => {
                Err(LimsError::AlreadySubmitted(self.sample_id.to_string()))
            }
        }
    }

    /// Record an operator-entered value for one parameter.
    ///
    /// Any text is accepted; unparseable input simply leaves the parameter without a flag
    /// and blocks submission as incomplete.
    pub fn enter_value(
        &mut self,
        parameter_id: &str,
        raw: impl Into<String>,
    ) -> LimsResult<&Parameter> {
        self.ensure_draft()?;

        let parameter = self
            .groups
            .iter_mut()
            .flat_map(|g| g.parameters.iter_mut())
            .find(|p| p.id == parameter_id)
            .ok_or_else(|| LimsError::UnknownParameter(parameter_id.to_string()))?;

        if !parameter.editable {
            return Err(LimsError::ParameterNotEditable(parameter_id.to_string()));
        }

        parameter.raw_value = raw.into();
        self.version += 1;

        tracing::debug!(
            sample_id = %self.sample_id,
            parameter_id,
            flag = ?parameter.flag(),
            "result value entered"
        );

        Ok(parameter)
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> LimsResult<()> {
        self.ensure_draft()?;
        self.notes = notes.into();
        self.version += 1;
        Ok(())
    }

    /// Set the clinician-notification acknowledgment.
    ///
    /// Acknowledging a set with no critical values is allowed and has no effect on the gate.
    pub fn set_critical_acknowledged(&mut self, acknowledged: bool) -> LimsResult<()> {
        self.ensure_draft()?;
        self.critical_acknowledged = acknowledged;
        self.version += 1;
        Ok(())
    }

    /// Submit the set for verification.
    ///
    /// On success the set becomes `Submitted` and the allowing decision is returned.
    ///
    /// # Errors
    ///
    /// - `LimsError::AlreadySubmitted` if the set was submitted before.
    /// - `LimsError::SubmissionRejected` carrying the gate decision; the set is unchanged.
    pub fn submit(
        &mut self,
        submitted_by: NonEmptyText,
        at: DateTime<Utc>,
    ) -> LimsResult<SubmissionDecision> {
        self.ensure_draft()?;

        let decision = evaluate_submission(self);
        if !decision.allowed {
            tracing::warn!(
                sample_id = %self.sample_id,
                reason = ?decision.reason,
                detail = ?decision.detail,
                "result set submission rejected"
            );
            return Err(LimsError::SubmissionRejected(decision));
        }

        self.status = ResultSetStatus::Submitted;
        self.submitted_at = Some(at);
        self.submitted_by = Some(submitted_by);
        self.version += 1;

        tracing::info!(
            sample_id = %self.sample_id,
            submitted_by = ?self.submitted_by.as_ref().map(NonEmptyText::as_str),
            "result set submitted for verification"
        );

        Ok(decision)
    }
}
