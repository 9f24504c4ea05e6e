//! Test: lifecycle state machine and event delivery

use crate::helpers::*;
use serde_json::json;
use stagehand::core::error::ControllerError;
use stagehand::core::state::{ControllerEvent, ControllerState};
use stagehand::Controller;

fn noop_pipeline() -> serde_json::Value {
    pipeline_of_steps(vec![json!({"name": "noop", "set": 1, "variable": "x"})])
}

#[test]
fn test_operations_are_guarded_by_state() {
    let (pipeline, _context) = compile_stubbed(&noop_pipeline());

    // Nothing but start is legal from CONSTRUCTED.
    assert!(matches!(
        pipeline.pause(),
        Err(ControllerError::IllegalState { operation: "pause", .. })
    ));
    assert!(matches!(
        pipeline.resume(),
        Err(ControllerError::IllegalState { operation: "resume", .. })
    ));
    assert!(matches!(
        pipeline.stop(),
        Err(ControllerError::IllegalState { operation: "stop", .. })
    ));

    pipeline.start().unwrap();
    assert_finished(&pipeline);

    // Terminal states reject everything, including a second start.
    assert!(matches!(
        pipeline.start(),
        Err(ControllerError::IllegalState { operation: "start", .. })
    ));
}

#[test]
fn test_events_arrive_in_lifecycle_order() {
    let (pipeline, _context) = compile_stubbed(&noop_pipeline());
    let log = EventLog::new();
    let _sub = pipeline.on_changed(log.callback());

    pipeline.start().unwrap();

    assert_eq!(
        log.events(),
        vec![ControllerEvent::Started, ControllerEvent::Finished]
    );
}

#[test]
fn test_specific_subscription_filters() {
    let (pipeline, _context) = compile_stubbed(&noop_pipeline());
    let log = EventLog::new();
    let _sub = pipeline.subscribe(ControllerEvent::Finished, log.callback());

    pipeline.start().unwrap();

    assert_eq!(log.events(), vec![ControllerEvent::Finished]);
}

#[test]
fn test_unsubscribe_is_idempotent() {
    let (pipeline, _context) = compile_stubbed(&noop_pipeline());
    let log = EventLog::new();
    let sub = pipeline.on_changed(log.callback());

    sub.unsubscribe();
    sub.unsubscribe();

    pipeline.start().unwrap();
    assert!(log.events().is_empty());
}

#[test]
fn test_destroy_cancels_and_is_idempotent() {
    let (pipeline, _context) = compile_stubbed(&noop_pipeline());
    let log = EventLog::new();
    let _sub = pipeline.on_changed(log.callback());

    pipeline.destroy().unwrap();
    assert_eq!(pipeline.state(), ControllerState::Cancelled);
    assert!(log.contains(ControllerEvent::Cancelled));

    // Listeners are gone and a second destroy changes nothing.
    pipeline.destroy().unwrap();
    assert_eq!(pipeline.state(), ControllerState::Cancelled);
    assert_eq!(log.events().len(), 1);
}

#[test]
fn test_destroy_after_finish_keeps_final_state() {
    let (pipeline, _context) = compile_stubbed(&noop_pipeline());
    pipeline.start().unwrap();
    assert_finished(&pipeline);

    pipeline.destroy().unwrap();
    assert_eq!(pipeline.state(), ControllerState::Finished);
}

#[test]
fn test_state_tree_reports_numeric_codes() {
    let (pipeline, _context) = compile_stubbed(&noop_pipeline());
    let before = pipeline.to_state();
    assert_eq!(before.state, 0);

    pipeline.start().unwrap();
    let after = pipeline.to_state();
    assert_eq!(after.state, 4);
    assert_eq!(after.kind, "stagehand.pipeline");

    let stage = &after.stages.as_ref().unwrap()[0];
    assert_eq!(stage.state, 4);
    let job = &stage.jobs.as_ref().unwrap()[0];
    let step = &job.steps.as_ref().unwrap()[0];
    assert_eq!(step.kind, "stagehand.step.variable");
    assert_eq!(step.state, 4);
}

#[test]
fn test_listeners_may_reenter_the_tree() {
    // A listener may call back into the tree while an event is being
    // delivered.
    let (pipeline, _context) = compile_stubbed(&noop_pipeline());
    let probe = pipeline.clone();
    let _sub = pipeline.on_changed(std::sync::Arc::new(move |_| {
        let _ = probe.state();
        let _ = probe.to_state();
    }));
    pipeline.start().unwrap();
    assert_finished(&pipeline);
}
