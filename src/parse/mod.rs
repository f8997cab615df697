//! Load phase: CWL file → canonical YAML → typed model.

pub mod normalize;

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::model::process::{CommandLineTool, Process, Workflow};

/// Resolve a path that must be an existing regular file.
pub(crate) fn resolve_file(path: &Path) -> Result<PathBuf> {
    let resolved = path
        .canonicalize()
        .map_err(|_| Error::FileNotFound(path.to_path_buf()))?;
    if !resolved.is_file() {
        return Err(Error::NotAFile(resolved));
    }
    Ok(resolved)
}

/// Load a process from a CWL file, dispatching on its `class`.
pub fn load(path: impl AsRef<Path>) -> Result<Process> {
    let file = resolve_file(path.as_ref())?;
    let doc = normalize::normalize_path(&file)?;
    let class = doc
        .as_mapping()
        .and_then(|map| map.get("class"))
        .and_then(Value::as_str)
        .ok_or_else(|| Error::BadCwlProcessFile {
            path: file.clone(),
            reason: "missing class discriminator".into(),
        })?;
    match class {
        "CommandLineTool" => Ok(Process::CommandLineTool(CommandLineTool::from_value(&doc)?)),
        "Workflow" => Ok(Process::Workflow(Workflow::from_value(&doc)?)),
        other => Err(Error::UnsupportedProcessClass(other.to_string())),
    }
}

impl Process {
    /// Factory for both process classes; see [`load`].
    pub fn load(path: impl AsRef<Path>) -> Result<Process> {
        load(path)
    }
}

impl CommandLineTool {
    /// Load a file that must hold a `CommandLineTool`.
    pub fn load(path: impl AsRef<Path>) -> Result<CommandLineTool> {
        match load(path)? {
            Process::CommandLineTool(tool) => Ok(tool),
            Process::Workflow(_) => Err(Error::UnsupportedProcessClass(
                "expected CommandLineTool, got Workflow".into(),
            )),
        }
    }
}

impl Workflow {
    /// Load a file that must hold a `Workflow`.
    pub fn load(path: impl AsRef<Path>) -> Result<Workflow> {
        match load(path)? {
            Process::Workflow(workflow) => Ok(workflow),
            Process::CommandLineTool(_) => Err(Error::UnsupportedProcessClass(
                "expected Workflow, got CommandLineTool".into(),
            )),
        }
    }
}
