//! The `CommandLineTool` and `Workflow` document entities.
//!
//! A process is identified by a URI-like id pointing at its source file;
//! its name is always derived from the id, never stored. Loading lives in
//! the parse phase; the document representation (`to_value`) lives here so
//! a process can be saved independent of how it was produced.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::model::params::{
    CommandInputParameter, CommandOutputParameter, WorkflowInputParameter, WorkflowOutputParameter,
};
use crate::model::requirements::ProcessRequirement;
use crate::model::step::{WorkflowStep, resolve_dir};
use crate::model::types::CwlType;

// =============================================================================
// URI HELPERS
// =============================================================================

/// Render an absolute path as a `file://` URI.
pub fn path_to_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Extract the filesystem path from a `file://` URI; non-URI ids pass
/// through as plain paths.
pub fn uri_to_path(id: &str) -> PathBuf {
    let raw = id.strip_prefix("file://").unwrap_or(id);
    PathBuf::from(percent_decode(raw))
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Derive a process name from its id: the filename stem of the URI path.
fn name_from_id(id: &str) -> String {
    uri_to_path(id)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.to_string())
}

// =============================================================================
// COMMAND LINE TOOL
// =============================================================================

/// A CWL document describing a single invocable program.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLineTool {
    pub id: String,
    pub cwl_version: String,
    pub base_command: Option<String>,
    pub stdout: Option<String>,
    pub doc: Option<String>,
    pub label: Option<String>,
    pub requirements: Vec<ProcessRequirement>,
    pub inputs: Vec<CommandInputParameter>,
    pub outputs: Vec<CommandOutputParameter>,
}

impl CommandLineTool {
    pub fn name(&self) -> String {
        name_from_id(&self.id)
    }

    /// Build a tool from its canonical document form.
    pub fn from_value(doc: &Value) -> Result<CommandLineTool> {
        let map = expect_class(doc, "CommandLineTool")?;
        let id = require_str(map, "id")?;
        let inputs = parse_listing(map, "inputs", CommandInputParameter::from_value)?;
        let outputs = parse_listing(map, "outputs", CommandOutputParameter::from_value)?;
        Ok(CommandLineTool {
            id,
            cwl_version: opt_str(map, "cwlVersion").unwrap_or_else(|| "v1.2".to_string()),
            base_command: opt_str(map, "baseCommand"),
            stdout: opt_str(map, "stdout"),
            doc: opt_str(map, "doc"),
            label: opt_str(map, "label"),
            requirements: parse_requirements(map)?,
            inputs,
            outputs,
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        let mut map = Mapping::new();
        map.insert(Value::from("class"), Value::from("CommandLineTool"));
        map.insert(Value::from("id"), Value::from(self.id.as_str()));
        map.insert(Value::from("cwlVersion"), Value::from(self.cwl_version.as_str()));
        emit_opt_str(&mut map, "label", &self.label);
        emit_opt_str(&mut map, "doc", &self.doc);
        emit_requirements(&mut map, &self.requirements)?;
        emit_opt_str(&mut map, "baseCommand", &self.base_command);
        emit_opt_str(&mut map, "stdout", &self.stdout);
        map.insert(
            Value::from("inputs"),
            collect_listing(&self.inputs, CommandInputParameter::to_value)?,
        );
        map.insert(
            Value::from("outputs"),
            collect_listing(&self.outputs, CommandOutputParameter::to_value)?,
        );
        Ok(Value::Mapping(map))
    }

    /// Write the tool as `<dir>/<name>.cwl` and return the written path.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        write_process(&self.to_value()?, &self.name(), dir.as_ref())
    }
}

// =============================================================================
// WORKFLOW
// =============================================================================

/// A CWL document describing a directed graph of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub id: String,
    pub cwl_version: String,
    pub requirements: Vec<ProcessRequirement>,
    pub inputs: Vec<WorkflowInputParameter>,
    pub outputs: Vec<WorkflowOutputParameter>,
    pub steps: Vec<WorkflowStep>,
    pub from_builder: bool,
}

impl Workflow {
    pub fn name(&self) -> String {
        name_from_id(&self.id)
    }

    pub fn input(&self, id: &str) -> Option<&WorkflowInputParameter> {
        self.inputs.iter().find(|input| input.id == id)
    }

    pub fn output(&self, id: &str) -> Option<&WorkflowOutputParameter> {
        self.outputs.iter().find(|output| output.id == id)
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Build a workflow from its canonical document form.
    pub fn from_value(doc: &Value) -> Result<Workflow> {
        let map = expect_class(doc, "Workflow")?;
        let id = require_str(map, "id")?;
        let inputs = parse_listing(map, "inputs", WorkflowInputParameter::from_value)?;
        let outputs = parse_listing(map, "outputs", WorkflowOutputParameter::from_value)?;
        let steps = parse_listing(map, "steps", WorkflowStep::from_value)?;
        Ok(Workflow {
            id,
            cwl_version: opt_str(map, "cwlVersion").unwrap_or_else(|| "v1.2".to_string()),
            requirements: parse_requirements(map)?,
            inputs,
            outputs,
            steps,
            from_builder: false,
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        let mut map = Mapping::new();
        map.insert(Value::from("class"), Value::from("Workflow"));
        map.insert(Value::from("id"), Value::from(self.id.as_str()));
        map.insert(Value::from("cwlVersion"), Value::from(self.cwl_version.as_str()));
        emit_requirements(&mut map, &self.requirements)?;
        map.insert(
            Value::from("inputs"),
            Value::Sequence(self.inputs.iter().map(WorkflowInputParameter::to_value).collect()),
        );
        map.insert(
            Value::from("outputs"),
            Value::Sequence(self.outputs.iter().map(WorkflowOutputParameter::to_value).collect()),
        );
        map.insert(
            Value::from("steps"),
            Value::Sequence(self.steps.iter().map(WorkflowStep::to_value).collect()),
        );
        Ok(Value::Mapping(map))
    }

    /// Write the workflow as `<dir>/<name>.cwl` and return the written path.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        write_process(&self.to_value()?, &self.name(), dir.as_ref())
    }
}

// =============================================================================
// PROCESS
// =============================================================================

/// A loaded process: the union of the document classes the model supports.
#[derive(Debug, Clone, PartialEq)]
pub enum Process {
    CommandLineTool(CommandLineTool),
    Workflow(Workflow),
}

impl Process {
    pub fn id(&self) -> &str {
        match self {
            Process::CommandLineTool(tool) => &tool.id,
            Process::Workflow(workflow) => &workflow.id,
        }
    }

    pub fn name(&self) -> String {
        name_from_id(self.id())
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            Process::CommandLineTool(_) => "CommandLineTool",
            Process::Workflow(_) => "Workflow",
        }
    }

    pub fn requirements(&self) -> &[ProcessRequirement] {
        match self {
            Process::CommandLineTool(tool) => &tool.requirements,
            Process::Workflow(workflow) => &workflow.requirements,
        }
    }

    /// The declared inputs as `(id, type, optional)` views.
    pub fn input_ports(&self) -> Vec<(&str, &CwlType, bool)> {
        match self {
            Process::CommandLineTool(tool) => tool
                .inputs
                .iter()
                .map(|input| (input.id.as_str(), &input.ty, input.optional))
                .collect(),
            Process::Workflow(workflow) => workflow
                .inputs
                .iter()
                .map(|input| (input.id.as_str(), &input.ty, input.optional))
                .collect(),
        }
    }

    /// The declared outputs as `(id, type)` views.
    pub fn output_ports(&self) -> Vec<(&str, &CwlType)> {
        match self {
            Process::CommandLineTool(tool) => tool
                .outputs
                .iter()
                .map(|output| (output.id.as_str(), &output.ty))
                .collect(),
            Process::Workflow(workflow) => workflow
                .outputs
                .iter()
                .map(|output| (output.id.as_str(), &output.ty))
                .collect(),
        }
    }

    /// Dispatch on the `class` discriminator of a canonical document.
    pub fn from_value(doc: &Value) -> Result<Process> {
        let class = doc
            .as_mapping()
            .and_then(|map| map.get("class"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingField {
                context: "process".into(),
                field: "class",
            })?;
        match class {
            "CommandLineTool" => Ok(Process::CommandLineTool(CommandLineTool::from_value(doc)?)),
            "Workflow" => Ok(Process::Workflow(Workflow::from_value(doc)?)),
            other => Err(Error::UnsupportedProcessClass(other.to_string())),
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        match self {
            Process::CommandLineTool(tool) => tool.to_value(),
            Process::Workflow(workflow) => workflow.to_value(),
        }
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        match self {
            Process::CommandLineTool(tool) => tool.save(dir),
            Process::Workflow(workflow) => workflow.save(dir),
        }
    }
}

// =============================================================================
// DOCUMENT HELPERS
// =============================================================================

fn expect_class<'a>(doc: &'a Value, class: &str) -> Result<&'a Mapping> {
    let map = doc
        .as_mapping()
        .ok_or_else(|| Error::UnexpectedType(format!("{doc:?}")))?;
    let found = map
        .get("class")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MissingField {
            context: "process".into(),
            field: "class",
        })?;
    if found != class {
        return Err(Error::UnsupportedProcessClass(format!(
            "expected {class}, got {found}"
        )));
    }
    Ok(map)
}

fn require_str(map: &Mapping, field: &'static str) -> Result<String> {
    map.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MissingField {
            context: "process".into(),
            field,
        })
}

fn opt_str(map: &Mapping, field: &str) -> Option<String> {
    map.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_requirements(map: &Mapping) -> Result<Vec<ProcessRequirement>> {
    match map.get("requirements") {
        Some(raw) => Ok(serde_yaml::from_value(raw.clone())?),
        None => Ok(Vec::new()),
    }
}

fn parse_listing<T>(
    map: &Mapping,
    field: &'static str,
    parse: impl Fn(&Value) -> Result<T>,
) -> Result<Vec<T>> {
    match map.get(field) {
        Some(Value::Sequence(entries)) => entries.iter().map(parse).collect(),
        Some(other) => Err(Error::UnexpectedType(format!("{other:?}"))),
        None => Ok(Vec::new()),
    }
}

fn collect_listing<T>(items: &[T], emit: impl Fn(&T) -> Result<Value>) -> Result<Value> {
    Ok(Value::Sequence(
        items.iter().map(emit).collect::<Result<Vec<_>>>()?,
    ))
}

fn emit_opt_str(map: &mut Mapping, field: &str, value: &Option<String>) {
    if let Some(value) = value {
        map.insert(Value::from(field), Value::from(value.as_str()));
    }
}

fn emit_requirements(map: &mut Mapping, requirements: &[ProcessRequirement]) -> Result<()> {
    if !requirements.is_empty() {
        map.insert(Value::from("requirements"), serde_yaml::to_value(requirements)?);
    }
    Ok(())
}

fn write_process(doc: &Value, name: &str, dir: &Path) -> Result<PathBuf> {
    let dir = resolve_dir(dir)?;
    let file_path = dir.join(format!("{name}.cwl"));
    std::fs::write(&file_path, serde_yaml::to_string(doc)?)?;
    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_round_trip() {
        let uri = path_to_uri(Path::new("/work/echo_string.cwl"));
        assert_eq!(uri, "file:///work/echo_string.cwl");
        assert_eq!(uri_to_path(&uri), PathBuf::from("/work/echo_string.cwl"));
    }

    #[test]
    fn uri_percent_decoding() {
        assert_eq!(
            uri_to_path("file:///work/my%20tool.cwl"),
            PathBuf::from("/work/my tool.cwl")
        );
    }

    #[test]
    fn name_is_filename_stem() {
        assert_eq!(name_from_id("file:///work/echo_string.cwl"), "echo_string");
        assert_eq!(name_from_id("wf3.cwl"), "wf3");
    }

    #[test]
    fn class_mismatch_is_rejected() {
        let doc: Value =
            serde_yaml::from_str("{class: Workflow, id: x.cwl, inputs: [], outputs: [], steps: []}")
                .unwrap();
        assert!(matches!(
            CommandLineTool::from_value(&doc),
            Err(Error::UnsupportedProcessClass(_))
        ));
    }

    #[test]
    fn unknown_class_is_rejected() {
        let doc: Value = serde_yaml::from_str("{class: ExpressionTool, id: x.cwl}").unwrap();
        assert!(matches!(
            Process::from_value(&doc),
            Err(Error::UnsupportedProcessClass(_))
        ));
    }

    #[test]
    fn empty_requirements_omitted() {
        let doc: Value = serde_yaml::from_str(
            "{class: Workflow, id: x.cwl, inputs: [], outputs: [], steps: []}",
        )
        .unwrap();
        let workflow = Workflow::from_value(&doc).unwrap();
        let out = workflow.to_value().unwrap();
        assert!(!out.as_mapping().unwrap().contains_key("requirements"));
    }
}
