//! Test: process-backed steps against the real OS backend

use crate::helpers::*;
use serde_json::json;
use stagehand::core::state::{ControllerEvent, ControllerState};
use stagehand::Controller;
use std::time::Duration;

fn shell_step(name: &str, script: &str) -> serde_json::Value {
    json!({"name": name, "command": "sh", "args": ["-c", script]})
}

#[tokio::test]
async fn test_script_output_lands_in_variable() {
    let mut step = shell_step("greet", "printf hello");
    step["output"] = json!("greeting");
    let data = pipeline_of_steps(vec![
        step,
        json!({"name": "check", "assert": "${greeting}", "equals": "hello"}),
    ]);
    let (pipeline, context) = compile_os(&data);

    pipeline.start().unwrap();
    wait_for_terminal(&pipeline).await;

    assert_finished(&pipeline);
    assert_eq!(context.get_variable("greeting"), Some(json!("hello")));
    assert!(pipeline.output_string().contains("hello"));
}

#[tokio::test]
async fn test_nonzero_exit_fails_step_and_pipeline() {
    let data = pipeline_of_steps(vec![shell_step("boom", "echo oops >&2; exit 3")]);
    let (pipeline, _context) = compile_os(&data);

    pipeline.start().unwrap();
    wait_for_terminal(&pipeline).await;

    assert_failed(&pipeline, "exited with code 3");
    assert_failed(&pipeline, "oops");
    // Diagnostic text bubbles up from the process's stderr.
    assert!(pipeline.error_string().contains("oops"));
}

#[tokio::test]
async fn test_env_and_interpolated_args_reach_the_process() {
    let data = pipeline_of_steps(vec![
        json!({"name": "bind", "set": "runtime-value", "variable": "word"}),
        json!({
            "name": "echo-env",
            "command": "sh",
            "args": ["-c", "printf \"%s:%s\" \"$MARKER\" \"${word}\""],
            "env": {"MARKER": "marked"},
            "output": "seen"
        }),
        json!({"name": "check", "assert": "${seen}", "equals": "marked:runtime-value"}),
    ]);
    let (pipeline, _context) = compile_os(&data);

    pipeline.start().unwrap();
    wait_for_terminal(&pipeline).await;
    assert_finished(&pipeline);
}

#[tokio::test]
async fn test_pause_and_resume_bubble_to_the_root() {
    let data = pipeline_of_steps(vec![shell_step("sleeper", "sleep 30")]);
    let (pipeline, _context) = compile_os(&data);
    let log = EventLog::new();
    let _sub = pipeline.on_changed(log.callback());

    pipeline.start().unwrap();
    assert_eq!(pipeline.state(), ControllerState::Started);

    pipeline.pause().unwrap();
    assert_eq!(pipeline.state(), ControllerState::Paused);
    assert!(log.contains(ControllerEvent::Paused));

    pipeline.resume().unwrap();
    assert_eq!(pipeline.state(), ControllerState::Started);
    assert!(log.contains(ControllerEvent::Resumed));

    pipeline.stop().unwrap();
    wait_for_terminal(&pipeline).await;
    assert_eq!(pipeline.state(), ControllerState::Cancelled);
    assert!(log.contains(ControllerEvent::Cancelled));
}

#[tokio::test]
async fn test_stop_cancels_before_the_child_dies() {
    let data = pipeline_of_steps(vec![shell_step("sleeper", "sleep 30")]);
    let (pipeline, _context) = compile_os(&data);

    pipeline.start().unwrap();
    pipeline.stop().unwrap();

    // CANCELLED is set synchronously; the SIGTERM exit that follows is
    // ignored.
    assert_eq!(pipeline.state(), ControllerState::Cancelled);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(pipeline.state(), ControllerState::Cancelled);
}

#[tokio::test]
async fn test_destroy_tears_down_a_running_pipeline() {
    let data = pipeline_of_steps(vec![shell_step("sleeper", "sleep 30")]);
    let (pipeline, _context) = compile_os(&data);

    pipeline.start().unwrap();
    pipeline.destroy().unwrap();

    assert_eq!(pipeline.state(), ControllerState::Cancelled);
}

#[tokio::test]
async fn test_parallel_jobs_actually_overlap() {
    // Both jobs sleep briefly; if they ran back to back the writes
    // could not both be present before a full second elapses.
    let data = pipeline_of_jobs(vec![
        json!({"name": "a", "steps": [
            {"name": "sa", "command": "sh", "args": ["-c", "sleep 0.3; printf a"], "output": "ra"}
        ]}),
        json!({"name": "b", "steps": [
            {"name": "sb", "command": "sh", "args": ["-c", "sleep 0.3; printf b"], "output": "rb"}
        ]}),
    ]);
    let (pipeline, context) = compile_os(&data);

    let start = std::time::Instant::now();
    pipeline.start().unwrap();
    wait_for_terminal(&pipeline).await;

    assert_finished(&pipeline);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(context.get_variable("ra"), Some(json!("a")));
    assert_eq!(context.get_variable("rb"), Some(json!("b")));
}
