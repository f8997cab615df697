pub mod build;
pub mod error;
pub mod model;
pub mod parse;

pub use build::{StepBuilder, WorkflowBuilder};
pub use error::{Error, Result};
pub use model::{CommandLineTool, Process, Workflow};
