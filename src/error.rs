//! Unified error type used across all phases.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::types::{CwlType, CwlValue};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // File/path errors
    #[error("{} does not exist", .0.display())]
    FileNotFound(PathBuf),
    #[error("{} is not a file", .0.display())]
    NotAFile(PathBuf),
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    // Parse errors
    #[error("invalid cwl file {}: {reason}", .path.display())]
    BadCwlProcessFile { path: PathBuf, reason: String },
    #[error("unsupported cwl process class: {0}")]
    UnsupportedProcessClass(String),

    #[error("{context} is missing required field '{field}'")]
    MissingField { context: String, field: &'static str },
    #[error("invalid output source reference '{0}' (expected stepId/outputId)")]
    InvalidOutputSource(String),

    // Type errors
    #[error("unexpected type: {0}")]
    UnexpectedType(String),
    #[error("{expected} != {actual}")]
    IncompatibleType { expected: CwlType, actual: CwlType },
    #[error("cannot assign {value:?} to {id} of type {ty}")]
    IncompatibleValue {
        id: String,
        ty: CwlType,
        value: CwlValue,
    },
    #[error("explicit null assignment to {0} is not supported")]
    NullAssignment(String),

    // Step construction errors
    #[error("additional input description is invalid: {0}")]
    CannotParseAdditionalInput(String),
    #[error("a when clause requires the names of the inputs it references")]
    MissingWhenInputNames,
    #[error("input '{0}' referenced by the when clause is unknown; declare it with add_input")]
    UnknownWhenInput(String),
    #[error("scattering an array type is not yet supported (input '{input_id}' of '{process}')")]
    ScatterOfArray { process: String, input_id: String },
    #[error("scatter references unknown input '{input_id}' of '{process}'")]
    UnknownScatterInput { process: String, input_id: String },

    // Step wiring errors
    #[error("step '{step_id}' has no input '{io_id}'")]
    UnknownStepInput { step_id: String, io_id: String },
    #[error("step '{step_id}' has no output '{io_id}'")]
    UnknownStepOutput { step_id: String, io_id: String },
    #[error("io '{io_id}' of step '{step_id}' carries no type information")]
    UntypedStepIo { step_id: String, io_id: String },

    // Workflow assembly errors
    #[error("chained input '{input_id}' of step '{step_id}' must be a Directory, found {ty}")]
    ChainedInputNotDirectory {
        step_id: String,
        input_id: String,
        ty: CwlType,
    },
    #[error("input '{input_id}' of step '{step_id}' references unknown step '{source_step}'")]
    UnknownSourceStep {
        step_id: String,
        input_id: String,
        source_step: String,
    },
    #[error("step dependency cycle detected at '{0}'")]
    DependencyCycle(String),
    #[error("workflow id '{0}' must not contain '/'")]
    InvalidWorkflowId(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
