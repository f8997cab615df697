//! Input/output parameter entities shared by tools and workflows.
//!
//! Every parameter has an id, a type and an optionality flag; the flag is
//! derived from the `[null, T]` declaration and restored on save, never set
//! independently.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::model::types::{CwlType, parse_param_type, serialize_param_type};

// =============================================================================
// CROSS-STEP REFERENCES
// =============================================================================

/// A typed reference to one output of one step.
///
/// The document form is the string `stepId/outputId`; the split form is
/// what the builders work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    pub step_id: String,
    pub output_id: String,
}

impl OutputRef {
    pub fn new(step_id: impl Into<String>, output_id: impl Into<String>) -> OutputRef {
        OutputRef {
            step_id: step_id.into(),
            output_id: output_id.into(),
        }
    }

    /// Parse the `stepId/outputId` document form.
    pub fn parse(raw: &str) -> Result<OutputRef> {
        match raw.split_once('/') {
            Some((step_id, output_id)) if !step_id.is_empty() && !output_id.is_empty() => {
                Ok(OutputRef::new(step_id, output_id))
            }
            _ => Err(Error::InvalidOutputSource(raw.to_string())),
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.step_id, self.output_id)
    }
}

// =============================================================================
// COMMAND LINE BINDINGS
// =============================================================================

/// How a tool input maps onto the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommandLineBinding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// How a tool output is collected from the wrapped program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutputBinding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_contents: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_eval: Option<String>,
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// A workflow-level input.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowInputParameter {
    pub id: String,
    pub ty: CwlType,
    pub optional: bool,
}

/// A workflow-level output, linked to a step output.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOutputParameter {
    pub id: String,
    pub ty: CwlType,
    pub optional: bool,
    pub output_source: OutputRef,
}

/// A command line tool input.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInputParameter {
    pub id: String,
    pub ty: CwlType,
    pub optional: bool,
    pub input_binding: Option<CommandLineBinding>,
}

/// A command line tool output.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutputParameter {
    pub id: String,
    pub ty: CwlType,
    pub optional: bool,
    pub output_binding: Option<CommandOutputBinding>,
}

/// Read the shared `id`/`type` pair of a parameter mapping.
fn param_parts(raw: &Value) -> Result<(String, CwlType, bool, Mapping)> {
    let map = raw
        .as_mapping()
        .ok_or_else(|| Error::UnexpectedType(format!("{raw:?}")))?;
    let id = map
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MissingField {
            context: "parameter".into(),
            field: "id",
        })?
        .to_string();
    let raw_type = map.get("type").ok_or_else(|| Error::MissingField {
        context: format!("parameter '{id}'"),
        field: "type",
    })?;
    let (ty, optional) = parse_param_type(raw_type)?;
    Ok((id, ty, optional, map.clone()))
}

fn param_header(id: &str, ty: &CwlType, optional: bool) -> Mapping {
    let mut map = Mapping::new();
    map.insert(Value::from("id"), Value::from(id));
    map.insert(Value::from("type"), serialize_param_type(ty, optional));
    map
}

impl WorkflowInputParameter {
    pub fn from_value(raw: &Value) -> Result<WorkflowInputParameter> {
        let (id, ty, optional, _) = param_parts(raw)?;
        Ok(WorkflowInputParameter { id, ty, optional })
    }

    pub fn to_value(&self) -> Value {
        Value::Mapping(param_header(&self.id, &self.ty, self.optional))
    }
}

impl WorkflowOutputParameter {
    pub fn from_value(raw: &Value) -> Result<WorkflowOutputParameter> {
        let (id, ty, optional, map) = param_parts(raw)?;
        let source = map
            .get("outputSource")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingField {
                context: format!("workflow output '{id}'"),
                field: "outputSource",
            })?;
        Ok(WorkflowOutputParameter {
            id,
            ty,
            optional,
            output_source: OutputRef::parse(source)?,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = param_header(&self.id, &self.ty, self.optional);
        map.insert(
            Value::from("outputSource"),
            Value::from(self.output_source.to_string()),
        );
        Value::Mapping(map)
    }
}

impl CommandInputParameter {
    pub fn from_value(raw: &Value) -> Result<CommandInputParameter> {
        let (id, ty, optional, map) = param_parts(raw)?;
        let input_binding = match map.get("inputBinding") {
            Some(binding) => Some(serde_yaml::from_value(binding.clone())?),
            None => None,
        };
        Ok(CommandInputParameter {
            id,
            ty,
            optional,
            input_binding,
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        let mut map = param_header(&self.id, &self.ty, self.optional);
        if let Some(binding) = &self.input_binding {
            map.insert(Value::from("inputBinding"), serde_yaml::to_value(binding)?);
        }
        Ok(Value::Mapping(map))
    }
}

impl CommandOutputParameter {
    pub fn from_value(raw: &Value) -> Result<CommandOutputParameter> {
        let (id, ty, optional, map) = param_parts(raw)?;
        let output_binding = match map.get("outputBinding") {
            Some(binding) => Some(serde_yaml::from_value(binding.clone())?),
            None => None,
        };
        Ok(CommandOutputParameter {
            id,
            ty,
            optional,
            output_binding,
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        let mut map = param_header(&self.id, &self.ty, self.optional);
        if let Some(binding) = &self.output_binding {
            map.insert(Value::from("outputBinding"), serde_yaml::to_value(binding)?);
        }
        Ok(Value::Mapping(map))
    }
}
