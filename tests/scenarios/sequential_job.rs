//! Test: sequential advancement through a job's steps

use crate::helpers::*;
use serde_json::json;
use stagehand::core::state::ControllerState;
use stagehand::Controller;

#[test]
fn test_steps_run_in_order_and_share_variables() {
    let data = pipeline_of_steps(vec![
        json!({"name": "first", "set": "one", "variable": "order.a"}),
        json!({"name": "second", "set": "${order.a}-two", "variable": "order.b"}),
        json!({"name": "third", "set": "${order.b}-three", "variable": "order.c"}),
    ]);
    let (pipeline, context) = compile_stubbed(&data);

    pipeline.start().unwrap();

    assert_finished(&pipeline);
    assert_eq!(context.get_variable("order.c"), Some(json!("one-two-three")));
}

#[test]
fn test_step_templates_compile_at_start_not_parse() {
    // The referenced variable does not exist at compile time; only the
    // value present when the step starts matters.
    let data = pipeline_of_steps(vec![
        json!({"name": "write", "set": 42, "variable": "late"}),
        json!({"name": "check", "assert": "${late}", "equals": 42}),
    ]);
    let (pipeline, _context) = compile_stubbed(&data);

    pipeline.start().unwrap();
    assert_finished(&pipeline);
}

#[test]
fn test_failing_step_fails_job_and_pipeline() {
    let data = pipeline_of_steps(vec![
        json!({"name": "ok", "set": 1, "variable": "x"}),
        json!({"name": "boom", "assert": 1, "equals": 2}),
        json!({"name": "never", "set": 3, "variable": "y"}),
    ]);
    let (pipeline, context) = compile_stubbed(&data);

    pipeline.start().unwrap();

    assert_failed(&pipeline, "boom");
    // The step after the failure never ran.
    assert_eq!(context.get_variable("y"), None);

    let dto = pipeline.to_state();
    let steps = dto.stages.as_ref().unwrap()[0].jobs.as_ref().unwrap()[0]
        .steps
        .clone()
        .unwrap();
    assert_eq!(steps[0].state, ControllerState::Finished.code());
    assert_eq!(steps[1].state, ControllerState::Failed.code());
    assert_eq!(steps[2].state, ControllerState::Constructed.code());
}

#[test]
fn test_compile_error_in_mid_sequence_step_fails_parent() {
    // The second step's command compiles to null; its start() fails
    // synchronously inside the advancement handler.
    let data = pipeline_of_steps(vec![
        json!({"name": "ok", "set": 1, "variable": "x"}),
        json!({"name": "broken", "command": "${no.such.command}"}),
    ]);
    let (pipeline, _context) = compile_stubbed(&data);

    pipeline.start().unwrap();
    assert_failed(&pipeline, "wrong shape");
}

#[test]
fn test_stages_gate_each_other() {
    let data = json!({
        "name": "two-stages",
        "stages": [
            {"name": "first", "jobs": [{"name": "j1", "steps": [
                {"name": "a", "set": "early", "variable": "from_first"}
            ]}]},
            {"name": "second", "jobs": [{"name": "j2", "steps": [
                {"name": "b", "assert": "${from_first}", "equals": "early"}
            ]}]}
        ]
    });
    let (pipeline, _context) = compile_stubbed(&data);

    pipeline.start().unwrap();
    assert_finished(&pipeline);
}

#[test]
fn test_failed_stage_prevents_later_stages() {
    let data = json!({
        "name": "gated",
        "stages": [
            {"name": "first", "jobs": [{"name": "j1", "steps": [
                {"name": "bad", "assert": true, "equals": false}
            ]}]},
            {"name": "second", "jobs": [{"name": "j2", "steps": [
                {"name": "b", "set": 1, "variable": "ran"}
            ]}]}
        ]
    });
    let (pipeline, context) = compile_stubbed(&data);

    pipeline.start().unwrap();
    assert_failed(&pipeline, "j1");
    assert_eq!(context.get_variable("ran"), None);

    let dto = pipeline.to_state();
    let stages = dto.stages.unwrap();
    assert_eq!(stages[0].state, ControllerState::Failed.code());
    assert_eq!(stages[1].state, ControllerState::Constructed.code());
}
