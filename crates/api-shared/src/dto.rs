//! Request and response bodies for the LIMS APIs.
//!
//! Views are built from domain types and always carry derived flags, so clients never have
//! to classify values themselves.

use lims_core::sample::{Gender, Patient, Priority, Sample, SampleStatus, TubeType};
use lims_core::{
    AcceptanceDecision, AuditEvent, FlagSummary, LimsError, LimsResult, NonEmptyText, Page,
    Parameter, ParameterGroup, ReferenceRange, RejectionCategory, RejectionReason, ResultFlag,
    ResultSet, ResultSetStatus, SubmissionDecision,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionRes>,
}

// ============================================================================
// Views
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParameterView {
    pub id: String,
    pub name: String,
    /// Raw value as entered.
    pub result: String,
    /// Parsed value; absent when blank or not a number.
    pub value: Option<f64>,
    pub unit: String,
    pub reference_low: f64,
    pub reference_high: f64,
    pub critical_low: f64,
    pub critical_high: f64,
    #[schema(value_type = Option<String>, example = "CRITICAL_HIGH")]
    pub flag: Option<ResultFlag>,
    pub editable: bool,
}

impl From<&Parameter> for ParameterView {
    fn from(p: &Parameter) -> Self {
        let (critical_low, critical_high) = p.range.critical_bounds();
        Self {
            id: p.id.to_string(),
            name: p.name.to_string(),
            result: p.raw_value.clone(),
            value: p.value(),
            unit: p.unit.clone(),
            reference_low: p.range.low(),
            reference_high: p.range.high(),
            critical_low,
            critical_high,
            flag: p.flag(),
            editable: p.editable,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GroupView {
    pub name: String,
    pub parameters: Vec<ParameterView>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FlagSummaryView {
    pub normal: usize,
    pub low: usize,
    pub high: usize,
    pub critical_low: usize,
    pub critical_high: usize,
    pub missing: usize,
}

impl From<FlagSummary> for FlagSummaryView {
    fn from(s: FlagSummary) -> Self {
        Self {
            normal: s.normal,
            low: s.low,
            high: s.high,
            critical_low: s.critical_low,
            critical_high: s.critical_high,
            missing: s.missing,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResultSetView {
    pub sample_id: String,
    pub test_type: String,
    #[schema(value_type = String, example = "DRAFT")]
    pub status: ResultSetStatus,
    pub version: u64,
    pub notes: String,
    pub critical_acknowledged: bool,
    pub has_critical: bool,
    /// Ids of parameters currently flagged critical.
    pub critical_parameters: Vec<String>,
    pub summary: FlagSummaryView,
    pub groups: Vec<GroupView>,
    pub submitted_at: Option<String>,
    pub submitted_by: Option<String>,
}

impl From<&ResultSet> for ResultSetView {
    fn from(set: &ResultSet) -> Self {
        Self {
            sample_id: set.sample_id().to_string(),
            test_type: set.test_type().to_string(),
            status: set.status(),
            version: set.version(),
            notes: set.notes().to_string(),
            critical_acknowledged: set.critical_acknowledged(),
            has_critical: set.has_critical(),
            critical_parameters: set
                .critical_parameters()
                .into_iter()
                .map(|p| p.id.to_string())
                .collect(),
            summary: set.flag_summary().into(),
            groups: set
                .groups()
                .iter()
                .map(|g| GroupView {
                    name: g.name.clone(),
                    parameters: g.parameters.iter().map(ParameterView::from).collect(),
                })
                .collect(),
            submitted_at: set.submitted_at().map(|t| t.to_rfc3339()),
            submitted_by: set.submitted_by().map(ToString::to_string),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListResultSetsRes {
    pub result_sets: Vec<ResultSetView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DecisionRes {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "CRITICAL_UNACKNOWLEDGED")]
    pub reason: Option<RejectionReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<SubmissionDecision> for DecisionRes {
    fn from(d: SubmissionDecision) -> Self {
        Self {
            allowed: d.allowed,
            reason: d.reason,
            detail: d.detail,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientView {
    pub pid: String,
    pub name: String,
    pub age: u16,
    #[schema(value_type = String, example = "F")]
    pub gender: Gender,
    pub ward_room: Option<String>,
}

impl From<&Patient> for PatientView {
    fn from(p: &Patient) -> Self {
        Self {
            pid: p.pid.to_string(),
            name: p.name.to_string(),
            age: p.age,
            gender: p.gender,
            ward_room: p.ward_room.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SampleView {
    pub sample_id: String,
    pub order_id: String,
    pub patient: PatientView,
    pub test_type: String,
    pub test_codes: Vec<String>,
    #[schema(value_type = String, example = "URGENT")]
    pub priority: Priority,
    #[schema(value_type = Vec<String>)]
    pub tube_types: Vec<TubeType>,
    pub department: Option<String>,
    #[schema(value_type = String, example = "RECEIVED_AT_LAB")]
    pub status: SampleStatus,
}

impl From<&Sample> for SampleView {
    fn from(s: &Sample) -> Self {
        Self {
            sample_id: s.sample_id.to_string(),
            order_id: s.order_id.to_string(),
            patient: PatientView::from(&s.patient),
            test_type: s.test_type.clone(),
            test_codes: s.test_codes.clone(),
            priority: s.priority,
            tube_types: s.tube_types.clone(),
            department: s.department.clone(),
            status: s.status(),
        }
    }
}

/// One page of the sample worklist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SampleListRes {
    pub samples: Vec<SampleView>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl From<Page<Sample>> for SampleListRes {
    fn from(page: Page<Sample>) -> Self {
        Self {
            samples: page.items.iter().map(SampleView::from).collect(),
            page: page.page,
            page_size: page.page_size,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateParameterReq {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub unit: String,
    pub reference_low: f64,
    pub reference_high: f64,
    #[serde(default = "default_true")]
    pub editable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateGroupReq {
    pub name: String,
    pub parameters: Vec<CreateParameterReq>,
}

/// Result set created from upstream order data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateResultSetReq {
    pub sample_id: String,
    #[serde(default)]
    pub test_type: String,
    #[serde(default)]
    pub notes: String,
    pub groups: Vec<CreateGroupReq>,
}

impl TryFrom<CreateResultSetReq> for ResultSet {
    type Error = LimsError;

    fn try_from(req: CreateResultSetReq) -> LimsResult<Self> {
        let groups = req
            .groups
            .into_iter()
            .map(|g| -> LimsResult<ParameterGroup> {
                let parameters = g
                    .parameters
                    .into_iter()
                    .map(|p| -> LimsResult<Parameter> {
                        let parameter = Parameter::new(
                            NonEmptyText::new(&p.id)?,
                            NonEmptyText::new(&p.name)?,
                            p.unit,
                            ReferenceRange::new(p.reference_low, p.reference_high)?,
                        )
                        .with_value(p.result);
                        Ok(if p.editable {
                            parameter
                        } else {
                            parameter.read_only()
                        })
                    })
                    .collect::<LimsResult<Vec<_>>>()?;
                Ok(ParameterGroup::new(g.name, parameters))
            })
            .collect::<LimsResult<Vec<_>>>()?;

        Ok(ResultSet::new(NonEmptyText::new(&req.sample_id)?, req.test_type, groups)?
            .with_notes(req.notes))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnterValueReq {
    pub version: u64,
    pub operator: String,
    pub result: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateNotesReq {
    pub version: u64,
    pub operator: String,
    pub notes: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AcknowledgeReq {
    pub version: u64,
    pub operator: String,
    pub acknowledged: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitReq {
    pub version: u64,
    pub operator: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitRes {
    pub decision: DecisionRes,
    pub result_set: ResultSetView,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassifyReq {
    pub value: f64,
    pub reference_low: f64,
    pub reference_high: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassifyRes {
    #[schema(value_type = String, example = "LOW")]
    pub flag: ResultFlag,
    pub critical: bool,
    pub critical_low: f64,
    pub critical_high: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AcceptSampleReq {
    pub operator: String,
    /// Ids of the standard verification checks that passed.
    pub checked: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AcceptSampleRes {
    pub allowed: bool,
    pub outstanding: Option<String>,
    pub sample: SampleView,
}

impl AcceptSampleRes {
    pub fn new(decision: AcceptanceDecision, sample: &Sample) -> Self {
        Self {
            allowed: decision.allowed,
            outstanding: decision.outstanding,
            sample: SampleView::from(sample),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RejectSampleReq {
    pub operator: String,
    #[schema(value_type = String, example = "HEMOLYZED")]
    pub category: RejectionCategory,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default = "default_true")]
    pub notify_phlebotomy: bool,
    #[serde(default = "default_true")]
    pub request_recollection: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditListRes {
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<AuditEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lims_core::fixtures::{demo_result_set, demo_worklist};
    use lims_core::WorklistQuery;

    #[test]
    fn view_carries_derived_flags() {
        let set = demo_result_set().expect("fixture");
        let view = ResultSetView::from(&set);

        assert!(view.has_critical);
        assert_eq!(view.critical_parameters, vec!["k".to_string()]);
        assert_eq!(view.summary.critical_high, 1);

        let potassium = &view.groups[1].parameters[1];
        assert_eq!(potassium.flag, Some(ResultFlag::CriticalHigh));
        assert_eq!(potassium.value, Some(6.8));
        assert!((potassium.critical_high - 6.63).abs() < 1e-9);

        let json = serde_json::to_value(&view).expect("serialise");
        assert_eq!(json["status"], "DRAFT");
        assert_eq!(json["groups"][1]["parameters"][1]["flag"], "CRITICAL_HIGH");
    }

    #[test]
    fn create_request_builds_draft_set() {
        let req: CreateResultSetReq = serde_json::from_str(
            r#"{
                "sample_id": "S-9",
                "groups": [{"name": "ELECTROLYTES", "parameters": [
                    {"id": "k", "name": "Potassium (K+)", "reference_low": 3.5, "reference_high": 5.1}
                ]}]
            }"#,
        )
        .expect("deserialise");
        let set = ResultSet::try_from(req).expect("valid request");
        assert_eq!(set.status(), ResultSetStatus::Draft);
        assert!(set.parameter("k").is_some_and(|p| p.editable && p.value().is_none()));
    }

    #[test]
    fn create_request_rejects_blank_ids_and_bad_ranges() {
        let req = CreateResultSetReq {
            sample_id: " ".into(),
            test_type: String::new(),
            notes: String::new(),
            groups: vec![],
        };
        assert!(matches!(ResultSet::try_from(req), Err(LimsError::Text(_))));

        let req = CreateResultSetReq {
            sample_id: "S-9".into(),
            test_type: String::new(),
            notes: String::new(),
            groups: vec![CreateGroupReq {
                name: "G".into(),
                parameters: vec![CreateParameterReq {
                    id: "k".into(),
                    name: "Potassium".into(),
                    result: String::new(),
                    unit: String::new(),
                    reference_low: 5.1,
                    reference_high: 3.5,
                    editable: true,
                }],
            }],
        };
        assert!(matches!(
            ResultSet::try_from(req),
            Err(LimsError::InvalidInput(_))
        ));
    }

    #[test]
    fn sample_list_keeps_paging_fields() {
        let samples = demo_worklist().expect("fixture");
        let page = WorklistQuery::default()
            .with_page_size(2)
            .with_page(3)
            .run(&samples);
        let res = SampleListRes::from(page);
        assert_eq!(res.samples.len(), 1);
        assert_eq!((res.page, res.total_pages, res.total_items), (3, 3, 5));

        let json = serde_json::to_value(&res).expect("serialise");
        assert_eq!(json["samples"][0]["sample_id"], "LB-2023-0991");
        assert_eq!(json["samples"][0]["status"], "RECEIVED_AT_LAB");
        assert_eq!(json["samples"][0]["priority"], "NORMAL");
        assert_eq!(json["samples"][0]["patient"]["gender"], "F");
    }
}
