use std::path::PathBuf;

use cwl_builder::model::{BasicKind, CommandLineTool, CwlType, Process, Workflow};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn load_tool(name: &str) -> Process {
    Process::CommandLineTool(CommandLineTool::load(fixture_path(name)).expect("fixture loads"))
}

pub fn load_workflow(name: &str) -> Workflow {
    Workflow::load(fixture_path(name)).expect("fixture loads")
}

pub fn string_ty() -> CwlType {
    CwlType::basic(BasicKind::String)
}

pub fn array_of(items: CwlType) -> CwlType {
    CwlType::array(items)
}
