//! Assemble built steps into a new [`Workflow`] document.
//!
//! Unconnected step inputs become workflow-level inputs, step outputs
//! become workflow-level outputs, and the feature requirements the steps
//! actually use are inferred. The terminal `build` writes the document to
//! disk so the fresh workflow can immediately be wrapped as a step of a
//! larger one.

use std::path::{Path, PathBuf};

use log::debug;

use crate::build::graph::StepGraph;
use crate::error::{Error, Result};
use crate::model::params::{OutputRef, WorkflowInputParameter, WorkflowOutputParameter};
use crate::model::process::{Process, Workflow, path_to_uri, uri_to_path};
use crate::model::requirements::ProcessRequirement;
use crate::model::step::{Source, WorkflowStep, resolve_dir};
use crate::model::types::{BasicKind, CwlType, CwlValue};

pub struct WorkflowBuilder {
    id: String,
    steps: Vec<WorkflowStep>,
    directory: PathBuf,
    expose_all_outputs: bool,
}

/// Generate an id for a workflow io. `/` is forbidden in these ids because
/// it collides with the `step/output` reference syntax.
fn workflow_io_id(workflow_id: &str, step_id: &str, io_id: &str) -> String {
    format!("{workflow_id}___{step_id}___{io_id}")
}

impl WorkflowBuilder {
    pub fn new(id: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder {
            id: id.into(),
            steps: Vec::new(),
            directory: PathBuf::from("."),
            expose_all_outputs: true,
        }
    }

    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = WorkflowStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Where the workflow document (and any chained staging directories)
    /// are materialized. Defaults to the current directory.
    pub fn directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.directory = dir.as_ref().to_path_buf();
        self
    }

    /// When disabled, step outputs already consumed by another step are
    /// not re-exposed as workflow outputs.
    pub fn expose_all_outputs(mut self, expose: bool) -> Self {
        self.expose_all_outputs = expose;
        self
    }

    /// Assemble the workflow, write `<dir>/<id>.cwl` and return the model.
    pub fn build(mut self) -> Result<Workflow> {
        if self.id.contains('/') {
            return Err(Error::InvalidWorkflowId(self.id));
        }
        let directory = resolve_dir(&self.directory)?;

        let graph = StepGraph::build(&self.steps)?;
        graph.ensure_acyclic()?;

        let mut workflow_inputs: Vec<WorkflowInputParameter> = Vec::new();
        let mut workflow_outputs: Vec<WorkflowOutputParameter> = Vec::new();
        let mut scatter_requirement = false;
        let mut subworkflow_requirement = false;
        let mut inline_javascript_requirement = false;

        for index in 0..self.steps.len() {
            let step_id = self.steps[index].id.clone();
            if !self.steps[index].scatter.is_empty() {
                scatter_requirement = true;
            }
            if self.steps[index].when.is_some() {
                inline_javascript_requirement = true;
            }

            let output_ids: Vec<String> = self.steps[index]
                .outputs
                .iter()
                .map(|output| output.id.clone())
                .collect();

            for input_index in 0..self.steps[index].inputs.len() {
                let input = &self.steps[index].inputs[input_index];
                if !input.source.is_unset() {
                    continue;
                }
                // Unset optional inputs are simply dropped from the
                // generated document.
                if input.optional && input.value.is_none() {
                    continue;
                }
                let input_id = input.id.clone();

                // A step input named like one of the step's own outputs is
                // the "takes a directory, fills it, hands it on" pattern.
                // When that output feeds another step, stage a directory
                // for it instead of surfacing a workflow input.
                if output_ids.contains(&input_id)
                    && !graph.consumers(&step_id, &input_id).is_empty()
                {
                    let input = &mut self.steps[index].inputs[input_index];
                    let ty = input.ty.as_ref().ok_or_else(|| Error::UntypedStepIo {
                        step_id: step_id.clone(),
                        io_id: input_id.clone(),
                    })?;
                    if *ty != CwlType::basic(BasicKind::Directory) {
                        return Err(Error::ChainedInputNotDirectory {
                            step_id: step_id.clone(),
                            input_id: input_id.clone(),
                            ty: ty.clone(),
                        });
                    }
                    // Flat name: nested staging directories clash with how
                    // runners copy staged data back.
                    let staged = PathBuf::from(format!("{step_id}__{input_id}"));
                    std::fs::create_dir_all(directory.join(&staged))?;
                    debug!("staged directory {} for {step_id}/{input_id}", staged.display());
                    input.value = Some(CwlValue::Path(staged));
                    continue;
                }

                let workflow_input_id = workflow_io_id(&self.id, &step_id, &input_id);
                let input = &mut self.steps[index].inputs[input_index];
                let ty = input.ty.clone().ok_or_else(|| Error::UntypedStepIo {
                    step_id: step_id.clone(),
                    io_id: input_id.clone(),
                })?;
                debug!("synthesized workflow input {workflow_input_id}");
                workflow_inputs.push(WorkflowInputParameter {
                    id: workflow_input_id.clone(),
                    ty,
                    optional: false,
                });
                input.source = Source::WorkflowInput(workflow_input_id);
            }

            for output in &self.steps[index].outputs {
                if !self.expose_all_outputs
                    && !graph.consumers(&step_id, &output.id).is_empty()
                {
                    continue;
                }
                let ty = output.ty.clone().ok_or_else(|| Error::UntypedStepIo {
                    step_id: step_id.clone(),
                    io_id: output.id.clone(),
                })?;
                workflow_outputs.push(WorkflowOutputParameter {
                    id: workflow_io_id(&self.id, &step_id, &output.id),
                    ty,
                    optional: false,
                    output_source: OutputRef::new(step_id.clone(), output.id.clone()),
                });
            }

            // Running another workflow as a step needs the subworkflow
            // feature enabled on the outer document.
            let run = self.steps[index].run.clone();
            match Process::load(uri_to_path(&run))? {
                Process::Workflow(_) => subworkflow_requirement = true,
                Process::CommandLineTool(_) => {}
            }
        }

        let mut requirements = Vec::new();
        if scatter_requirement {
            requirements.push(ProcessRequirement::ScatterFeatureRequirement);
        }
        if subworkflow_requirement {
            requirements.push(ProcessRequirement::SubworkflowFeatureRequirement);
        }
        if inline_javascript_requirement {
            requirements.push(ProcessRequirement::inline_javascript());
        }

        // Steps reference their own processes by absolute URI, so the new
        // workflow must be resolvable as a unit before it hits the disk.
        let id = path_to_uri(&directory.join(format!("{}.cwl", self.id)));

        let workflow = Workflow {
            id,
            cwl_version: "v1.2".to_string(),
            requirements,
            inputs: workflow_inputs,
            outputs: workflow_outputs,
            steps: self.steps,
            from_builder: true,
        };
        workflow.save(&directory)?;
        Ok(workflow)
    }
}
