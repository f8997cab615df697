//! Integration tests for the workflow builder: io synthesis, linking,
//! requirement inference, directory chaining, subworkflow wrapping and
//! job-config export.

#[allow(dead_code)]
mod helpers;

use std::path::PathBuf;

use cwl_builder::error::Error;
use cwl_builder::model::{CwlValue, Process, Source, Workflow};
use cwl_builder::{StepBuilder, WorkflowBuilder};
use helpers::*;

/// Two unlinked single-io steps: every input and output surfaces.
#[test]
fn every_unconnected_io_is_synthesized() {
    let dir = tempfile::tempdir().unwrap();
    let step1 = StepBuilder::new(&load_tool("echo_string.cwl")).build().unwrap();
    let step2 = StepBuilder::new(&load_tool("uppercase.cwl")).build().unwrap();

    let workflow = WorkflowBuilder::new("wf3")
        .steps([step1, step2])
        .directory(dir.path())
        .build()
        .unwrap();

    assert_eq!(workflow.inputs.len(), 2);
    assert_eq!(workflow.outputs.len(), 2);
    assert!(workflow.from_builder);
    assert!(dir.path().join("wf3.cwl").exists());
}

/// Linking K inputs to earlier outputs leaves M - K workflow inputs.
#[test]
fn linked_inputs_are_not_synthesized() {
    let dir = tempfile::tempdir().unwrap();
    let step1 = StepBuilder::new(&load_tool("echo_string.cwl")).build().unwrap();
    let mut step2 = StepBuilder::new(&load_tool("uppercase.cwl")).build().unwrap();
    step2
        .connect("message", step1.output("message_string").unwrap())
        .unwrap();

    let workflow = WorkflowBuilder::new("wf3")
        .steps([step1, step2])
        .directory(dir.path())
        .build()
        .unwrap();

    assert_eq!(workflow.inputs.len(), 1);
    assert_eq!(workflow.inputs[0].id, "wf3___step_echo_string___message");
    assert_eq!(workflow.outputs.len(), 2);

    let uppercase = workflow.step("step_uppercase").unwrap();
    assert_eq!(
        uppercase.input("message").unwrap().source.as_ref_string(),
        Some("step_echo_string/message_string".to_string())
    );
    // requirement-free workflow omits the requirements key entirely
    let doc = workflow.to_value().unwrap();
    assert!(!doc.as_mapping().unwrap().contains_key("requirements"));
}

#[test]
fn already_consumed_outputs_can_be_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let step1 = StepBuilder::new(&load_tool("echo_string.cwl")).build().unwrap();
    let mut step2 = StepBuilder::new(&load_tool("uppercase.cwl")).build().unwrap();
    step2
        .connect("message", step1.output("message_string").unwrap())
        .unwrap();

    let workflow = WorkflowBuilder::new("wf_hidden")
        .steps([step1, step2])
        .directory(dir.path())
        .expose_all_outputs(false)
        .build()
        .unwrap();

    assert_eq!(workflow.outputs.len(), 1);
    assert_eq!(
        workflow.outputs[0].output_source.to_string(),
        "step_uppercase/uppercase_message"
    );
}

/// Scattered, linked steps: one array-typed input, two array-typed outputs.
#[test]
fn scattered_steps_promote_workflow_ios() {
    let dir = tempfile::tempdir().unwrap();
    let step1 = StepBuilder::new(&load_tool("echo_string.cwl"))
        .scatter(["message"])
        .build()
        .unwrap();
    let mut step2 = StepBuilder::new(&load_tool("uppercase.cwl"))
        .scatter(["message"])
        .build()
        .unwrap();
    step2
        .connect("message", step1.output("message_string").unwrap())
        .unwrap();

    let workflow = WorkflowBuilder::new("wf_scatter")
        .steps([step1, step2])
        .directory(dir.path())
        .build()
        .unwrap();

    assert_eq!(workflow.inputs.len(), 1);
    assert_eq!(workflow.inputs[0].ty, array_of(string_ty()));
    assert_eq!(workflow.outputs.len(), 2);
    for output in &workflow.outputs {
        assert_eq!(output.ty, array_of(string_ty()));
    }
    assert!(
        workflow
            .requirements
            .iter()
            .any(|req| req.class_name() == "ScatterFeatureRequirement")
    );
}

#[test]
fn when_step_infers_inline_javascript() {
    let dir = tempfile::tempdir().unwrap();
    let step1 = StepBuilder::new(&load_tool("echo_string.cwl")).build().unwrap();
    let mut step2 = StepBuilder::new(&load_tool("touch_single.cwl"))
        .when("$(inputs.should_execute < 1)", ["should_execute"])
        .add_input(serde_yaml::from_str("{id: should_execute, type: int}").unwrap())
        .build()
        .unwrap();
    step2
        .connect("touchfiles", step1.output("message_string").unwrap())
        .unwrap();

    let workflow = WorkflowBuilder::new("wf_conditional")
        .steps([step1, step2])
        .directory(dir.path())
        .build()
        .unwrap();

    // echo message + the declared conditional input
    assert_eq!(workflow.inputs.len(), 2);
    assert_eq!(
        workflow
            .requirements
            .iter()
            .map(|req| req.class_name())
            .collect::<Vec<_>>(),
        vec!["InlineJavascriptRequirement"]
    );
}

/// A same-named Directory in/out pair feeding another step gets a staged
/// directory instead of a workflow input.
#[test]
fn directory_chain_is_staged() {
    let dir = tempfile::tempdir().unwrap();
    let step1 = StepBuilder::new(&load_tool("collect_files.cwl")).build().unwrap();
    let mut step2 = StepBuilder::new(&load_tool("count_files.cwl")).build().unwrap();
    step2
        .connect("data_dir", step1.output("out_dir").unwrap())
        .unwrap();

    let workflow = WorkflowBuilder::new("wf_chain")
        .steps([step1, step2])
        .directory(dir.path())
        .build()
        .unwrap();

    // only src_dir surfaces; out_dir is satisfied by the staged directory
    assert_eq!(workflow.inputs.len(), 1);
    assert_eq!(workflow.inputs[0].id, "wf_chain___step_collect_files___src_dir");

    let collect = workflow.step("step_collect_files").unwrap();
    let staged = collect.input("out_dir").unwrap();
    assert_eq!(staged.source, Source::Unset);
    assert_eq!(
        staged.value,
        Some(CwlValue::Path(PathBuf::from("step_collect_files__out_dir")))
    );
    assert!(dir.path().join("step_collect_files__out_dir").is_dir());
    assert_eq!(workflow.outputs.len(), 2);
}

#[test]
fn chained_non_directory_pair_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let step1 = StepBuilder::new(&load_tool("pass_token.cwl")).build().unwrap();
    let mut step2 = StepBuilder::new(&load_tool("uppercase.cwl")).build().unwrap();
    step2.connect("message", step1.output("token").unwrap()).unwrap();

    let err = WorkflowBuilder::new("wf_bad_chain")
        .steps([step1, step2])
        .directory(dir.path())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::ChainedInputNotDirectory { .. }));
}

#[test]
fn unset_optional_inputs_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let tool_dir = tempfile::tempdir().unwrap();
    let tool_path = tool_dir.path().join("greet.cwl");
    std::fs::write(
        &tool_path,
        "cwlVersion: v1.2\nclass: CommandLineTool\nbaseCommand: greet\ninputs:\n- id: name\n  type: string\n- id: greeting\n  type: ['null', string]\noutputs: []\n",
    )
    .unwrap();
    let tool = Process::load(&tool_path).unwrap();
    let step = StepBuilder::new(&tool).build().unwrap();
    assert!(step.input("greeting").unwrap().optional);

    let workflow = WorkflowBuilder::new("wf_optional")
        .step(step)
        .directory(dir.path())
        .build()
        .unwrap();
    assert_eq!(workflow.inputs.len(), 1);
    assert_eq!(workflow.inputs[0].id, "wf_optional___step_greet___name");
}

#[test]
fn workflow_id_with_slash_is_rejected() {
    let err = WorkflowBuilder::new("bad/id").build().unwrap_err();
    assert!(matches!(err, Error::InvalidWorkflowId(_)));
}

#[test]
fn linking_unknown_step_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut step1 = StepBuilder::new(&load_tool("uppercase.cwl")).build().unwrap();
    step1.input_mut("message").unwrap().source =
        Source::parse("step_ghost/message_string").unwrap();

    let err = WorkflowBuilder::new("wf_dangling")
        .step(step1)
        .directory(dir.path())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::UnknownSourceStep { .. }));
}

/// Wrap a built workflow as a step of a larger one; values assigned before
/// wrapping bubble up through each layer.
#[test]
fn subworkflow_wrapping_bubbles_values() {
    let dir = tempfile::tempdir().unwrap();

    let mut step1 = StepBuilder::new(&load_tool("echo_string.cwl")).build().unwrap();
    let mut step2 = StepBuilder::new(&load_tool("uppercase.cwl")).build().unwrap();
    step2
        .connect("message", step1.output("message_string").unwrap())
        .unwrap();
    step1.assign_value("message", "test_message").unwrap();

    let inner = WorkflowBuilder::new("wf3")
        .steps([step1, step2])
        .directory(dir.path())
        .build()
        .unwrap();

    let inner_step = StepBuilder::new(&Process::Workflow(inner)).build().unwrap();
    assert_eq!(inner_step.id, "step_wf3");
    assert_eq!(
        inner_step
            .input("wf3___step_echo_string___message")
            .unwrap()
            .value,
        Some(CwlValue::Str("test_message".into()))
    );

    let mut step3 = StepBuilder::new(&load_tool("touch_single.cwl")).build().unwrap();
    step3
        .connect(
            "touchfiles",
            inner_step
                .output("wf3___step_uppercase___uppercase_message")
                .unwrap(),
        )
        .unwrap();

    let outer = WorkflowBuilder::new("wf4")
        .steps([inner_step, step3])
        .directory(dir.path())
        .build()
        .unwrap();

    assert!(
        outer
            .requirements
            .iter()
            .any(|req| req.class_name() == "SubworkflowFeatureRequirement")
    );
    assert_eq!(outer.inputs.len(), 1);
    assert_eq!(
        outer.inputs[0].id,
        "wf4___step_wf3___wf3___step_echo_string___message"
    );

    // the outer document is itself loadable again
    let reloaded = Workflow::load(dir.path().join("wf4.cwl")).unwrap();
    assert_eq!(reloaded.steps.len(), 2);
}

#[test]
fn wrapped_workflow_exports_config() {
    let dir = tempfile::tempdir().unwrap();
    let step1 = StepBuilder::new(&load_tool("echo_string.cwl")).build().unwrap();
    let workflow = WorkflowBuilder::new("wf_config")
        .step(step1)
        .directory(dir.path())
        .build()
        .unwrap();

    let mut wrapper = StepBuilder::new(&Process::Workflow(workflow)).build().unwrap();
    wrapper
        .assign_value("wf_config___step_echo_string___message", "hello")
        .unwrap();

    let config_path = wrapper.save_config(dir.path()).unwrap();
    assert_eq!(config_path.file_name().unwrap(), "step_wf_config.yaml");
    let content = std::fs::read_to_string(config_path).unwrap();
    insta::assert_snapshot!(content, @"wf_config___step_echo_string___message: hello");
}

#[test]
fn config_serializes_directory_values() {
    let dir = tempfile::tempdir().unwrap();
    let mut step = StepBuilder::new(&load_tool("count_files.cwl")).build().unwrap();
    step.assign_value("data_dir", PathBuf::from("data/input_dir"))
        .unwrap();

    let config_path = step.save_config(dir.path()).unwrap();
    let content = std::fs::read_to_string(config_path).unwrap();
    insta::assert_snapshot!(content, @r"
    data_dir:
      class: Directory
      location: data/input_dir
    ");
}

#[test]
fn save_config_requires_existing_directory() {
    let mut step = StepBuilder::new(&load_tool("count_files.cwl")).build().unwrap();
    step.assign_value("data_dir", PathBuf::from("data/input_dir"))
        .unwrap();
    let err = step.save_config("does/not/exist").unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}
