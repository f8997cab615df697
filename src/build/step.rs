//! Build a [`WorkflowStep`] from a loaded process.
//!
//! Every process input/output becomes an assignable step input/output.
//! Scattered inputs are promoted by one array level, and scattering any
//! input promotes all outputs. A `when` clause may reference inputs the
//! process does not declare; those are supplied as additional raw input
//! declarations.

use std::collections::HashSet;

use log::debug;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::model::params::WorkflowInputParameter;
use crate::model::process::Process;
use crate::model::step::{Source, WorkflowStep, WorkflowStepInput, WorkflowStepOutput};
use crate::model::types::CwlType;

pub struct StepBuilder<'a> {
    process: &'a Process,
    scatter: Vec<String>,
    when: Option<String>,
    when_input_names: Vec<String>,
    add_inputs: Vec<Value>,
}

impl<'a> StepBuilder<'a> {
    pub fn new(process: &'a Process) -> StepBuilder<'a> {
        StepBuilder {
            process,
            scatter: Vec::new(),
            when: None,
            when_input_names: Vec::new(),
            add_inputs: Vec::new(),
        }
    }

    /// Scatter over the given input ids.
    pub fn scatter<I, S>(mut self, input_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scatter = input_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a conditional-execution clause together with the names of
    /// the inputs it references.
    pub fn when<I, S>(mut self, expression: &str, input_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.when = Some(expression.to_string());
        self.when_input_names = input_names.into_iter().map(Into::into).collect();
        self
    }

    /// Declare an extra input not present on the process, as a raw
    /// parameter mapping (`{id, type}`).
    pub fn add_input(mut self, raw: Value) -> Self {
        self.add_inputs.push(raw);
        self
    }

    pub fn build(self) -> Result<WorkflowStep> {
        let step_id = format!("step_{}", self.process.name());
        let run = self.process.id().to_string();

        // Parse additional declarations first to surface problems early.
        let add_inputs: Vec<WorkflowInputParameter> = self
            .add_inputs
            .iter()
            .map(|raw| {
                WorkflowInputParameter::from_value(raw)
                    .map_err(|err| Error::CannotParseAdditionalInput(err.to_string()))
            })
            .collect::<Result<_>>()?;

        let process_input_ids: HashSet<&str> = self
            .process
            .input_ports()
            .iter()
            .map(|(id, _, _)| *id)
            .collect();
        let add_input_ids: HashSet<&str> =
            add_inputs.iter().map(|input| input.id.as_str()).collect();

        for scattered in &self.scatter {
            if !process_input_ids.contains(scattered.as_str())
                && !add_input_ids.contains(scattered.as_str())
            {
                return Err(Error::UnknownScatterInput {
                    process: self.process.name(),
                    input_id: scattered.clone(),
                });
            }
        }

        if self.when.is_some() {
            if self.when_input_names.is_empty() {
                return Err(Error::MissingWhenInputNames);
            }
            for name in &self.when_input_names {
                if !process_input_ids.contains(name.as_str())
                    && !add_input_ids.contains(name.as_str())
                {
                    return Err(Error::UnknownWhenInput(name.clone()));
                }
            }
        }

        let mut inputs = Vec::new();
        for (id, ty, optional) in self.process.input_ports() {
            inputs.push(WorkflowStepInput {
                id: id.to_string(),
                source: Source::Unset,
                ty: Some(self.input_type(id, ty)?),
                optional,
                value: None,
                step_id: step_id.clone(),
            });
        }
        for input in &add_inputs {
            inputs.push(WorkflowStepInput {
                id: input.id.clone(),
                source: Source::Unset,
                ty: Some(self.input_type(&input.id, &input.ty)?),
                optional: input.optional,
                value: None,
                step_id: step_id.clone(),
            });
        }

        // Scattering any input means each run yields one element of every
        // output, so all outputs promote.
        let mut outputs = Vec::new();
        for (id, ty) in self.process.output_ports() {
            let ty = if self.scatter.is_empty() {
                ty.clone()
            } else {
                self.promote(id, ty)?
            };
            outputs.push(WorkflowStepOutput {
                id: id.to_string(),
                ty: Some(ty),
                step_id: step_id.clone(),
            });
        }

        let mut step = WorkflowStep {
            id: step_id,
            run,
            inputs,
            outputs,
            scatter: self.scatter,
            when: self.when,
            from_builder: true,
        };

        // Wrapping a previously-built workflow: values assigned to its
        // sub-steps bubble up onto the matching inputs of the new step.
        if let Process::Workflow(workflow) = self.process {
            for sub_step in &workflow.steps {
                for sub_input in &sub_step.inputs {
                    let Source::WorkflowInput(source_id) = &sub_input.source else {
                        continue;
                    };
                    let Some(value) = &sub_input.value else {
                        continue;
                    };
                    if let Some(target) = step.input_mut(source_id) {
                        debug!(
                            "bubbling value of {}/{} up to {}",
                            sub_step.id, sub_input.id, source_id
                        );
                        target.value = Some(value.clone());
                    }
                }
            }
        }

        Ok(step)
    }

    fn input_type(&self, id: &str, ty: &CwlType) -> Result<CwlType> {
        if self.scatter.iter().any(|scattered| scattered == id) {
            self.promote(id, ty)
        } else {
            Ok(ty.clone())
        }
    }

    /// Scattering provides arrays of values of the original type.
    fn promote(&self, io_id: &str, ty: &CwlType) -> Result<CwlType> {
        if matches!(ty, CwlType::Array(_)) {
            return Err(Error::ScatterOfArray {
                process: self.process.name(),
                input_id: io_id.to_string(),
            });
        }
        Ok(CwlType::array(ty.clone()))
    }
}
