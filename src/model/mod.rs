//! The typed CWL document model.

pub mod params;
pub mod process;
pub mod requirements;
pub mod step;
pub mod types;

pub use params::{
    CommandInputParameter, CommandLineBinding, CommandOutputBinding, CommandOutputParameter,
    OutputRef, WorkflowInputParameter, WorkflowOutputParameter,
};
pub use process::{CommandLineTool, Process, Workflow};
pub use requirements::ProcessRequirement;
pub use step::{Source, WorkflowStep, WorkflowStepInput, WorkflowStepOutput};
pub use types::{BasicKind, CwlType, CwlValue};
