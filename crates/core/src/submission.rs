//! Submission gate for result sets.
//!
//! [`evaluate_submission`] decides whether a draft result set may be sent for verification.
//! It is a pure decision: callers apply the state transition and hand the decision to the
//! audit trail and notification workflow.

use crate::result_set::ResultSet;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// A parameter has no usable value.
    Incomplete,
    /// Critical values exist and clinician notification has not been acknowledged.
    CriticalUnacknowledged,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::Incomplete => "INCOMPLETE",
            RejectionReason::CriticalUnacknowledged => "CRITICAL_UNACKNOWLEDGED",
        }
    }
}

/// Outcome of the submission gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionReason>,
    /// For `Incomplete`, the name of the first parameter without a value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SubmissionDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            detail: None,
        }
    }

    pub fn incomplete(parameter_name: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(RejectionReason::Incomplete),
            detail: Some(parameter_name.into()),
        }
    }

    pub fn critical_unacknowledged() -> Self {
        Self {
            allowed: false,
            reason: Some(RejectionReason::CriticalUnacknowledged),
            detail: None,
        }
    }
}

impl fmt::Display for SubmissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.reason, &self.detail) {
            (None, _) => f.write_str("allowed"),
            (Some(RejectionReason::Incomplete), Some(name)) => {
                write!(f, "incomplete results, enter a value for {name}")
            }
            (Some(RejectionReason::Incomplete), None) => f.write_str("incomplete results"),
            (Some(RejectionReason::CriticalUnacknowledged), _) => {
                f.write_str("critical value acknowledgment required")
            }
        }
    }
}

/// Decide whether `result_set` may be submitted.
///
/// 1. Completeness: the first parameter (group order, then parameter order) without a
///    parseable value rejects the set as `Incomplete`, naming that parameter. This runs
///    first because flags on empty values cannot be trusted.
/// 2. Criticality: flags are recomputed from the current values; any critical flag without
///    acknowledgment rejects the set as `CriticalUnacknowledged`.
/// 3. Otherwise the submission is allowed.
pub fn evaluate_submission(result_set: &ResultSet) -> SubmissionDecision {
    let decision = if let Some(missing) = result_set.parameters().find(|p| p.value().is_none()) {
        SubmissionDecision::incomplete(missing.name.as_str())
    } else if result_set.has_critical() && !result_set.critical_acknowledged() {
        SubmissionDecision::critical_unacknowledged()
    } else {
        SubmissionDecision::allow()
    };

    tracing::debug!(
        sample_id = %result_set.sample_id(),
        allowed = decision.allowed,
        reason = decision.reason.map(RejectionReason::as_str),
        "submission evaluated"
    );

    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::ReferenceRange;
    use crate::result_set::{Parameter, ParameterGroup};
    use lims_types::NonEmptyText;

    fn text(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).expect("non-empty")
    }

    fn param(id: &str, name: &str, low: f64, high: f64, raw: &str) -> Parameter {
        Parameter::new(
            text(id),
            text(name),
            "mmol/L",
            ReferenceRange::new(low, high).expect("range"),
        )
        .with_value(raw)
    }

    fn result_set(groups: Vec<ParameterGroup>, acknowledged: bool) -> ResultSet {
        ResultSet::new(text("SAPP-2025-9912"), "CBC + Electrolytes", groups)
            .expect("valid set")
            .with_critical_acknowledged(acknowledged)
    }

    fn critical_potassium_set(acknowledged: bool) -> ResultSet {
        result_set(
            vec![ParameterGroup::new(
                "SERUM ELECTROLYTES",
                vec![
                    param("na", "Sodium (Na+)", 135.0, 145.0, "138"),
                    param("k", "Potassium (K+)", 3.5, 5.1, "6.8"),
                ],
            )],
            acknowledged,
        )
    }

    #[test]
    fn unacknowledged_critical_value_blocks_submission() {
        let decision = evaluate_submission(&critical_potassium_set(false));
        assert_eq!(decision, SubmissionDecision::critical_unacknowledged());
        assert_eq!(decision.detail, None);
    }

    #[test]
    fn acknowledged_critical_value_is_allowed() {
        let decision = evaluate_submission(&critical_potassium_set(true));
        assert_eq!(decision, SubmissionDecision::allow());
    }

    #[test]
    fn incomplete_takes_precedence_over_critical() {
        for acknowledged in [false, true] {
            let set = result_set(
                vec![ParameterGroup::new(
                    "SERUM ELECTROLYTES",
                    vec![
                        param("k", "Potassium (K+)", 3.5, 5.1, "6.8"),
                        param("cl", "Chloride (Cl-)", 96.0, 106.0, ""),
                    ],
                )],
                acknowledged,
            );
            let decision = evaluate_submission(&set);
            assert!(!decision.allowed);
            assert_eq!(decision.reason, Some(RejectionReason::Incomplete));
            assert_eq!(decision.detail.as_deref(), Some("Chloride (Cl-)"));
        }
    }

    #[test]
    fn names_first_missing_parameter_in_group_order() {
        let set = result_set(
            vec![
                ParameterGroup::new(
                    "COMPLETE BLOOD COUNT",
                    vec![
                        param("wbc", "WBC", 4.0, 10.0, "7.2"),
                        param("hgb", "Hemoglobin", 12.0, 17.0, "abc"),
                    ],
                ),
                ParameterGroup::new(
                    "SERUM ELECTROLYTES",
                    vec![param("na", "Sodium (Na+)", 135.0, 145.0, " ")],
                ),
            ],
            true,
        );
        assert_eq!(
            evaluate_submission(&set),
            SubmissionDecision::incomplete("Hemoglobin")
        );
    }

    #[test]
    fn acknowledgment_without_critical_values_is_harmless() {
        let set = result_set(
            vec![ParameterGroup::new(
                "SERUM ELECTROLYTES",
                vec![param("na", "Sodium (Na+)", 135.0, 145.0, "140")],
            )],
            true,
        );
        assert!(evaluate_submission(&set).allowed);
    }

    #[test]
    fn critical_low_also_requires_acknowledgment() {
        let set = result_set(
            vec![ParameterGroup::new(
                "SERUM ELECTROLYTES",
                vec![param("k", "Potassium (K+)", 3.5, 5.1, "2.0")],
            )],
            false,
        );
        assert_eq!(
            evaluate_submission(&set).reason,
            Some(RejectionReason::CriticalUnacknowledged)
        );
    }

    #[test]
    fn decision_wire_format_omits_empty_fields() {
        let json = serde_json::to_string(&SubmissionDecision::allow()).expect("serialise");
        assert_eq!(json, r#"{"allowed":true}"#);

        let json = serde_json::to_string(&SubmissionDecision::incomplete("Hemoglobin"))
            .expect("serialise");
        assert_eq!(
            json,
            r#"{"allowed":false,"reason":"INCOMPLETE","detail":"Hemoglobin"}"#
        );
    }
}
