//! Result-set documents in YAML or JSON.
//!
//! Responsibilities:
//! - Define a strict wire model for result-set files handed over by instruments or order
//!   systems
//! - Translate between the wire model and [`ResultSet`]
//! - Report schema mismatches with the path of the failing field
//!
//! Notes:
//! - Documents never carry flags; flags are derived on load
//! - Loaded sets are always drafts

use crate::flag::ReferenceRange;
use crate::result_set::{Parameter, ParameterGroup, ResultSet};
use crate::{LimsError, LimsResult};
use lims_types::NonEmptyText;
use serde::{Deserialize, Serialize};

// ============================================================================
// Public operations
// ============================================================================

pub struct ResultSetDocument;

impl ResultSetDocument {
    /// Parse a result set from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `LimsError::Document` naming the failing field when the YAML does not match
    /// the wire schema (unknown keys included), and the domain error when the content is
    /// well-formed but invalid (for example an inverted reference range).
    pub fn parse_yaml(yaml_text: &str) -> LimsResult<ResultSet> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let wire = serde_path_to_error::deserialize::<_, ResultSetWire>(deserializer)
            .map_err(|err| schema_error(err.path().to_string(), err.into_inner()))?;
        wire_to_domain(wire)
    }

    /// Parse a result set from JSON text.
    pub fn parse_json(json_text: &str) -> LimsResult<ResultSet> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let wire = serde_path_to_error::deserialize::<_, ResultSetWire>(&mut deserializer)
            .map_err(|err| schema_error(err.path().to_string(), err.into_inner()))?;
        wire_to_domain(wire)
    }

    /// Parse by content: text starting with `{` is JSON, anything else YAML.
    pub fn parse(text: &str) -> LimsResult<ResultSet> {
        if text.trim_start().starts_with('{') {
            Self::parse_json(text)
        } else {
            Self::parse_yaml(text)
        }
    }

    pub fn render_yaml(result_set: &ResultSet) -> LimsResult<String> {
        serde_yaml::to_string(&domain_to_wire(result_set))
            .map_err(|e| LimsError::Render(e.to_string()))
    }
}

fn schema_error(path: String, source: impl std::fmt::Display) -> LimsError {
    let path = if path.is_empty() || path == "." {
        "<root>".to_string()
    } else {
        path
    };
    LimsError::Document {
        path,
        message: source.to_string(),
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ResultSetWire {
    sample_id: String,
    #[serde(default)]
    test_type: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    critical_acknowledged: bool,
    groups: Vec<GroupWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct GroupWire {
    name: String,
    parameters: Vec<ParameterWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ParameterWire {
    id: String,
    name: String,
    #[serde(default)]
    result: String,
    #[serde(default)]
    unit: String,
    reference_low: f64,
    reference_high: f64,
    #[serde(default = "default_editable")]
    editable: bool,
}

fn default_editable() -> bool {
    true
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: ResultSetWire) -> LimsResult<ResultSet> {
    let groups = wire
        .groups
        .into_iter()
        .map(|group| -> LimsResult<ParameterGroup> {
            let parameters = group
                .parameters
                .into_iter()
                .map(parameter_to_domain)
                .collect::<LimsResult<Vec<_>>>()?;
            Ok(ParameterGroup::new(group.name, parameters))
        })
        .collect::<LimsResult<Vec<_>>>()?;

    let sample_id = NonEmptyText::new(&wire.sample_id)
        .map_err(|_| LimsError::InvalidInput("sample_id cannot be empty".into()))?;

    Ok(ResultSet::new(sample_id, wire.test_type, groups)?
        .with_notes(wire.notes)
        .with_critical_acknowledged(wire.critical_acknowledged))
}

fn parameter_to_domain(wire: ParameterWire) -> LimsResult<Parameter> {
    let id = NonEmptyText::new(&wire.id)
        .map_err(|_| LimsError::InvalidInput("parameter id cannot be empty".into()))?;
    let name = NonEmptyText::new(&wire.name)
        .map_err(|_| LimsError::InvalidInput(format!("parameter '{id}' has no name")))?;
    let range = ReferenceRange::new(wire.reference_low, wire.reference_high)
        .map_err(|e| LimsError::InvalidInput(format!("parameter '{id}': {e}")))?;

    let parameter = Parameter::new(id, name, wire.unit, range).with_value(wire.result);
    Ok(if wire.editable {
        parameter
    } else {
        parameter.read_only()
    })
}

fn domain_to_wire(result_set: &ResultSet) -> ResultSetWire {
    ResultSetWire {
        sample_id: result_set.sample_id().to_string(),
        test_type: result_set.test_type().to_string(),
        notes: result_set.notes().to_string(),
        critical_acknowledged: result_set.critical_acknowledged(),
        groups: result_set
            .groups()
            .iter()
            .map(|group| GroupWire {
                name: group.name.clone(),
                parameters: group
                    .parameters
                    .iter()
                    .map(|p| ParameterWire {
                        id: p.id.to_string(),
                        name: p.name.to_string(),
                        result: p.raw_value.clone(),
                        unit: p.unit.clone(),
                        reference_low: p.range.low(),
                        reference_high: p.range.high(),
                        editable: p.editable,
                    })
                    .collect(),
            })
            .collect(),
    }
}
