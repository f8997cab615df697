//! Workflow steps and their assignable input/output bindings.
//!
//! Cross-step links are held as typed [`Source`] references and only
//! rendered to the `stepId/outputId` string form at the document boundary,
//! which keeps a step serializable independent of its neighbours.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::model::params::OutputRef;
use crate::model::types::{CwlType, CwlValue};

// =============================================================================
// SOURCES
// =============================================================================

/// Where a step input takes its value from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Not connected yet. Unset inputs are dropped from the document.
    Unset,
    /// Connected to a workflow-level input.
    WorkflowInput(String),
    /// Connected to another step's output.
    StepOutput(OutputRef),
}

impl Source {
    /// Parse the document string form; a `/` marks a step-output reference.
    pub fn parse(raw: &str) -> Result<Source> {
        if raw.contains('/') {
            Ok(Source::StepOutput(OutputRef::parse(raw)?))
        } else {
            Ok(Source::WorkflowInput(raw.to_string()))
        }
    }

    /// The document string form, `None` while unset.
    pub fn as_ref_string(&self) -> Option<String> {
        match self {
            Source::Unset => None,
            Source::WorkflowInput(id) => Some(id.clone()),
            Source::StepOutput(output) => Some(output.to_string()),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Source::Unset)
    }
}

// =============================================================================
// STEP IO
// =============================================================================

/// A step input that can be assigned a literal value or linked to another
/// step's output.
///
/// Type, optionality and value are populated by the step builder; steps
/// parsed from an existing document carry no type information and cannot
/// be assigned to.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStepInput {
    pub id: String,
    pub source: Source,
    pub ty: Option<CwlType>,
    pub optional: bool,
    pub value: Option<CwlValue>,
    pub step_id: String,
}

/// A step output that other step inputs or workflow outputs can link to.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStepOutput {
    pub id: String,
    pub ty: Option<CwlType>,
    pub step_id: String,
}

// =============================================================================
// STEPS
// =============================================================================

/// One step of a workflow.
///
/// `run` references the wrapped process by id; the process itself is never
/// owned and is re-loaded on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStep {
    pub id: String,
    pub run: String,
    pub inputs: Vec<WorkflowStepInput>,
    pub outputs: Vec<WorkflowStepOutput>,
    /// Ids of inputs scattered over; empty when the step does not scatter.
    pub scatter: Vec<String>,
    /// Conditional-execution expression, if any.
    pub when: Option<String>,
    pub from_builder: bool,
}

impl WorkflowStep {
    pub fn input(&self, id: &str) -> Option<&WorkflowStepInput> {
        self.inputs.iter().find(|input| input.id == id)
    }

    pub fn input_mut(&mut self, id: &str) -> Option<&mut WorkflowStepInput> {
        self.inputs.iter_mut().find(|input| input.id == id)
    }

    pub fn output(&self, id: &str) -> Option<&WorkflowStepOutput> {
        self.outputs.iter().find(|output| output.id == id)
    }

    /// Assign a literal value to a step input, validating it against the
    /// input's declared type.
    pub fn assign_value(&mut self, input_id: &str, value: impl Into<CwlValue>) -> Result<()> {
        let step_id = self.id.clone();
        let input = self
            .input_mut(input_id)
            .ok_or_else(|| Error::UnknownStepInput {
                step_id: step_id.clone(),
                io_id: input_id.to_string(),
            })?;
        let value = value.into();
        if value == CwlValue::Null {
            return Err(Error::NullAssignment(input_id.to_string()));
        }
        let ty = input.ty.as_ref().ok_or_else(|| Error::UntypedStepIo {
            step_id: step_id.clone(),
            io_id: input_id.to_string(),
        })?;
        if !ty.is_valid(&value) {
            return Err(Error::IncompatibleValue {
                id: input.id.clone(),
                ty: ty.clone(),
                value,
            });
        }
        debug!("{step_id}: {input_id} = {value:?}");
        input.value = Some(value);
        Ok(())
    }

    /// Link a step input to another step's output.
    ///
    /// Declared types must match exactly; the link rewrites the input's
    /// source and leaves its value untouched.
    pub fn connect(&mut self, input_id: &str, output: &WorkflowStepOutput) -> Result<()> {
        let step_id = self.id.clone();
        let input = self
            .input_mut(input_id)
            .ok_or_else(|| Error::UnknownStepInput {
                step_id: step_id.clone(),
                io_id: input_id.to_string(),
            })?;
        let input_ty = input.ty.as_ref().ok_or_else(|| Error::UntypedStepIo {
            step_id: step_id.clone(),
            io_id: input_id.to_string(),
        })?;
        let output_ty = output.ty.as_ref().ok_or_else(|| Error::UntypedStepIo {
            step_id: output.step_id.clone(),
            io_id: output.id.clone(),
        })?;
        if input_ty != output_ty {
            return Err(Error::IncompatibleType {
                expected: input_ty.clone(),
                actual: output_ty.clone(),
            });
        }
        let source = OutputRef::new(output.step_id.clone(), output.id.clone());
        debug!("{step_id}: {input_id} <- {source}");
        input.source = Source::StepOutput(source);
        Ok(())
    }

    /// Write the concrete input values as a job-configuration document at
    /// `<dir>/<stepId>.yaml` and return the written path.
    pub fn save_config(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = resolve_dir(dir.as_ref())?;

        // BTreeMap gives the config a stable key order.
        let mut config = BTreeMap::new();
        for input in &self.inputs {
            let Some(value) = &input.value else { continue };
            let ty = input.ty.as_ref().ok_or_else(|| Error::UntypedStepIo {
                step_id: self.id.clone(),
                io_id: input.id.clone(),
            })?;
            config.insert(input.id.clone(), ty.serialize_value(value));
        }

        let file_path = dir.join(format!("{}.yaml", self.id));
        std::fs::write(&file_path, serde_yaml::to_string(&config)?)?;
        Ok(file_path)
    }

    /// The document representation of this step. Unset inputs are dropped;
    /// outputs flatten to their id strings.
    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert(Value::from("id"), Value::from(self.id.as_str()));
        map.insert(Value::from("run"), Value::from(self.run.as_str()));

        let inputs: Vec<Value> = self
            .inputs
            .iter()
            .filter_map(|input| {
                let source = input.source.as_ref_string()?;
                let mut entry = Mapping::new();
                entry.insert(Value::from("id"), Value::from(input.id.as_str()));
                entry.insert(Value::from("source"), Value::from(source));
                Some(Value::Mapping(entry))
            })
            .collect();
        map.insert(Value::from("in"), Value::Sequence(inputs));

        let outputs: Vec<Value> = self
            .outputs
            .iter()
            .map(|output| Value::from(output.id.as_str()))
            .collect();
        map.insert(Value::from("out"), Value::Sequence(outputs));

        if !self.scatter.is_empty() {
            map.insert(
                Value::from("scatter"),
                Value::Sequence(self.scatter.iter().map(|id| Value::from(id.as_str())).collect()),
            );
        }
        if let Some(when) = &self.when {
            map.insert(Value::from("when"), Value::from(when.as_str()));
        }
        Value::Mapping(map)
    }

    /// Build a step from its canonical document form.
    pub fn from_value(raw: &Value) -> Result<WorkflowStep> {
        let map = raw
            .as_mapping()
            .ok_or_else(|| Error::UnexpectedType(format!("{raw:?}")))?;
        let id = require_str(map, "id", "workflow step")?;
        let run = require_str(map, "run", &format!("step '{id}'"))?;

        let mut inputs = Vec::new();
        if let Some(Value::Sequence(entries)) = map.get("in") {
            for entry in entries {
                let entry_map = entry
                    .as_mapping()
                    .ok_or_else(|| Error::UnexpectedType(format!("{entry:?}")))?;
                let input_id = require_str(entry_map, "id", &format!("input of step '{id}'"))?;
                let source = require_str(entry_map, "source", &format!("input '{input_id}'"))?;
                inputs.push(WorkflowStepInput {
                    id: input_id,
                    source: Source::parse(&source)?,
                    ty: None,
                    optional: false,
                    value: None,
                    step_id: id.clone(),
                });
            }
        }

        let mut outputs = Vec::new();
        if let Some(Value::Sequence(entries)) = map.get("out") {
            for entry in entries {
                let output_id = entry
                    .as_str()
                    .ok_or_else(|| Error::UnexpectedType(format!("{entry:?}")))?;
                outputs.push(WorkflowStepOutput {
                    id: output_id.to_string(),
                    ty: None,
                    step_id: id.clone(),
                });
            }
        }

        let scatter = match map.get("scatter") {
            Some(Value::Sequence(entries)) => entries
                .iter()
                .map(|entry| {
                    entry
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| Error::UnexpectedType(format!("{entry:?}")))
                })
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };
        let when = map
            .get("when")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(WorkflowStep {
            id,
            run,
            inputs,
            outputs,
            scatter,
            when,
            from_builder: false,
        })
    }
}

fn require_str(map: &Mapping, field: &'static str, context: &str) -> Result<String> {
    map.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MissingField {
            context: context.to_string(),
            field,
        })
}

/// Resolve a path that must be an existing directory.
pub(crate) fn resolve_dir(path: &Path) -> Result<PathBuf> {
    let resolved = path
        .canonicalize()
        .map_err(|_| Error::FileNotFound(path.to_path_buf()))?;
    if !resolved.is_dir() {
        return Err(Error::NotADirectory(resolved));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::BasicKind;

    fn typed_input(id: &str, ty: CwlType) -> WorkflowStepInput {
        WorkflowStepInput {
            id: id.to_string(),
            source: Source::Unset,
            ty: Some(ty),
            optional: false,
            value: None,
            step_id: "step_test".to_string(),
        }
    }

    fn test_step() -> WorkflowStep {
        WorkflowStep {
            id: "step_test".to_string(),
            run: "test.cwl".to_string(),
            inputs: vec![typed_input("message", CwlType::basic(BasicKind::String))],
            outputs: vec![WorkflowStepOutput {
                id: "result".to_string(),
                ty: Some(CwlType::basic(BasicKind::String)),
                step_id: "step_test".to_string(),
            }],
            scatter: Vec::new(),
            when: None,
            from_builder: true,
        }
    }

    #[test]
    fn assign_valid_literal() {
        let mut step = test_step();
        step.assign_value("message", "hello").unwrap();
        assert_eq!(
            step.input("message").unwrap().value,
            Some(CwlValue::Str("hello".into()))
        );
    }

    #[test]
    fn assign_mismatched_literal_fails() {
        let mut step = test_step();
        let err = step.assign_value("message", 4).unwrap_err();
        assert!(matches!(err, Error::IncompatibleValue { .. }));
    }

    #[test]
    fn assign_null_fails() {
        let mut step = test_step();
        let err = step.assign_value("message", CwlValue::Null).unwrap_err();
        assert!(matches!(err, Error::NullAssignment(_)));
    }

    #[test]
    fn assign_unknown_input_fails() {
        let mut step = test_step();
        let err = step.assign_value("nope", "x").unwrap_err();
        assert!(matches!(err, Error::UnknownStepInput { .. }));
    }

    #[test]
    fn connect_matching_types() {
        let mut step = test_step();
        let output = WorkflowStepOutput {
            id: "out".to_string(),
            ty: Some(CwlType::basic(BasicKind::String)),
            step_id: "step_other".to_string(),
        };
        step.connect("message", &output).unwrap();
        assert_eq!(
            step.input("message").unwrap().source,
            Source::StepOutput(OutputRef::new("step_other", "out"))
        );
    }

    #[test]
    fn connect_mismatched_types_fails() {
        let mut step = test_step();
        let output = WorkflowStepOutput {
            id: "out".to_string(),
            ty: Some(CwlType::basic(BasicKind::Int)),
            step_id: "step_other".to_string(),
        };
        let err = step.connect("message", &output).unwrap_err();
        assert!(matches!(err, Error::IncompatibleType { .. }));
    }

    #[test]
    fn unset_inputs_dropped_from_document() {
        let mut step = test_step();
        step.inputs.push(typed_input("extra", CwlType::basic(BasicKind::Int)));
        step.input_mut("message").unwrap().source =
            Source::WorkflowInput("wf___step_test___message".into());
        let value = step.to_value();
        let inputs = value
            .as_mapping()
            .unwrap()
            .get("in")
            .unwrap()
            .as_sequence()
            .unwrap();
        assert_eq!(inputs.len(), 1);
    }

    #[test]
    fn document_round_trip() {
        let raw: Value = serde_yaml::from_str(
            "{id: step_x, run: tool.cwl, in: [{id: a, source: wf___a}], out: [b], scatter: [a], when: $(inputs.a)}",
        )
        .unwrap();
        let step = WorkflowStep::from_value(&raw).unwrap();
        assert_eq!(step.scatter, vec!["a"]);
        assert_eq!(step.when.as_deref(), Some("$(inputs.a)"));
        assert_eq!(step.to_value(), raw);
    }
}
