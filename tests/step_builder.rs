//! Integration tests for the step builder: wrapping processes, scatter
//! type promotion and conditional clauses.

#[allow(dead_code)]
mod helpers;

use cwl_builder::StepBuilder;
use cwl_builder::error::Error;
use cwl_builder::model::{BasicKind, CwlType, CwlValue, Source};
use helpers::*;

#[test]
fn build_step_from_tool() {
    let echo = load_tool("echo_string.cwl");
    let step = StepBuilder::new(&echo).build().unwrap();

    assert_eq!(step.id, "step_echo_string");
    assert_eq!(step.run, echo.id());
    assert!(step.from_builder);
    assert_eq!(step.inputs.len(), 1);
    assert_eq!(step.outputs.len(), 1);
    assert_eq!(step.input("message").unwrap().source, Source::Unset);
    assert_eq!(step.input("message").unwrap().ty, Some(string_ty()));
    assert_eq!(step.output("message_string").unwrap().ty, Some(string_ty()));
}

#[test]
fn assign_value_on_built_step() {
    let echo = load_tool("echo_string.cwl");
    let mut step = StepBuilder::new(&echo).build().unwrap();
    step.assign_value("message", "test_message").unwrap();
    assert_eq!(
        step.input("message").unwrap().value,
        Some(CwlValue::Str("test_message".into()))
    );

    let err = step.assign_value("message", 4).unwrap_err();
    assert!(matches!(err, Error::IncompatibleValue { .. }));
}

#[test]
fn scatter_promotes_inputs_and_outputs() {
    let echo = load_tool("echo_string.cwl");
    let mut step = StepBuilder::new(&echo).scatter(["message"]).build().unwrap();

    assert_eq!(step.scatter, vec!["message"]);
    assert_eq!(step.input("message").unwrap().ty, Some(array_of(string_ty())));
    assert_eq!(
        step.output("message_string").unwrap().ty,
        Some(array_of(string_ty()))
    );

    // arrays are assignable now, scalars no longer are
    step.assign_value("message", vec!["test_message"]).unwrap();
    let err = step.assign_value("message", "test_message").unwrap_err();
    assert!(matches!(err, Error::IncompatibleValue { .. }));
}

#[test]
fn scatter_of_array_input_is_rejected() {
    let echo_array = load_tool("echo_string_array.cwl");
    let err = StepBuilder::new(&echo_array)
        .scatter(["message"])
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::ScatterOfArray { .. }));
}

#[test]
fn scatter_of_unknown_input_is_rejected() {
    let echo = load_tool("echo_string.cwl");
    let err = StepBuilder::new(&echo).scatter(["msg"]).build().unwrap_err();
    assert!(matches!(err, Error::UnknownScatterInput { .. }));
}

#[test]
fn conditional_step_gains_declared_input() {
    let touch = load_tool("touch_single.cwl");
    let step = StepBuilder::new(&touch)
        .when("$(inputs.should_execute < 1)", ["should_execute"])
        .add_input(serde_yaml::from_str("{id: should_execute, type: int}").unwrap())
        .build()
        .unwrap();

    assert_eq!(step.when.as_deref(), Some("$(inputs.should_execute < 1)"));
    assert_eq!(step.inputs.len(), 2);
    let synthetic = step.input("should_execute").unwrap();
    assert_eq!(synthetic.ty, Some(CwlType::basic(BasicKind::Int)));
    assert_eq!(synthetic.source, Source::Unset);
}

#[test]
fn when_requires_input_names() {
    let touch = load_tool("touch_single.cwl");
    let err = StepBuilder::new(&touch)
        .when("$(inputs.should_execute < 1)", Vec::<String>::new())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::MissingWhenInputNames));
}

#[test]
fn when_rejects_undeclared_input() {
    let touch = load_tool("touch_single.cwl");
    let err = StepBuilder::new(&touch)
        .when("$(inputs.should_execute < 1)", ["should_execute"])
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::UnknownWhenInput(name) if name == "should_execute"));
}

#[test]
fn malformed_additional_input_is_rejected() {
    let touch = load_tool("touch_single.cwl");
    let err = StepBuilder::new(&touch)
        .add_input(serde_yaml::from_str("{id: should_execute}").unwrap())
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::CannotParseAdditionalInput(_)));
}

#[test]
fn wrapping_a_workflow_keeps_step_shape() {
    let workflow = load_workflow("workflow3.cwl");
    let step = StepBuilder::new(&cwl_builder::model::Process::Workflow(workflow))
        .build()
        .unwrap();
    assert_eq!(step.id, "step_workflow3");
    assert_eq!(step.inputs.len(), 1);
    assert_eq!(step.outputs.len(), 2);
}
