//! Test utility functions for stagehand

use serde_json::{json, Value};
use stagehand::core::events::EventCallback;
use stagehand::core::state::ControllerEvent;
use stagehand::runtime::PipelineRunner;
use stagehand::system::{OsSystem, StubSystem, System};
use stagehand::{Controller, PipelineController, SharedContext};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Wrap jobs into a single-stage pipeline model
pub fn pipeline_of_jobs(jobs: Vec<Value>) -> Value {
    json!({
        "name": "test-pipeline",
        "stages": [{"name": "only-stage", "jobs": jobs}]
    })
}

/// Wrap steps into a single-job, single-stage pipeline model
pub fn pipeline_of_steps(steps: Vec<Value>) -> Value {
    pipeline_of_jobs(vec![json!({"name": "only-job", "steps": steps})])
}

/// Compile a pipeline against the inert system backend
pub fn compile_stubbed(data: &Value) -> (PipelineController, SharedContext) {
    compile_with(data, Arc::new(StubSystem::new()))
}

/// Compile a pipeline against the real OS backend
pub fn compile_os(data: &Value) -> (PipelineController, SharedContext) {
    compile_with(data, Arc::new(OsSystem::new()))
}

pub fn compile_with(data: &Value, system: Arc<dyn System>) -> (PipelineController, SharedContext) {
    PipelineRunner::default()
        .load(data, system)
        .unwrap_or_else(|e| panic!("pipeline should compile: {}", e))
}

/// Event recorder usable as a controller callback
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ControllerEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> EventCallback {
        let events = self.events.clone();
        Arc::new(move |event| {
            events.lock().unwrap().push(event);
        })
    }

    pub fn events(&self) -> Vec<ControllerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, event: ControllerEvent) -> bool {
        self.events().contains(&event)
    }
}

/// Poll until the controller reaches a terminal state
pub async fn wait_for_terminal(controller: &dyn Controller) {
    let deadline = Duration::from_secs(10);
    let start = std::time::Instant::now();
    while !controller.is_terminal() {
        if start.elapsed() > deadline {
            panic!(
                "controller '{}' did not terminate, stuck in {:?}",
                controller.name(),
                controller.state()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn assert_finished(controller: &dyn Controller) {
    assert!(
        controller.is_successful(),
        "'{}' should have finished, was {:?} (error: {:?})",
        controller.name(),
        controller.state(),
        controller.error()
    );
}

pub fn assert_failed(controller: &dyn Controller, expected_error: &str) {
    assert!(
        controller.is_failed(),
        "'{}' should have failed, was {:?}",
        controller.name(),
        controller.state()
    );
    let error = controller.error().unwrap_or_default();
    assert!(
        error.contains(expected_error),
        "'{}' error:\n{}\n\ndoes not contain:\n{}",
        controller.name(),
        error,
        expected_error
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand::core::state::ControllerState;

    #[test]
    fn test_compile_stubbed_builds_constructed_tree() {
        let data = pipeline_of_steps(vec![json!({"name": "noop", "set": 1})]);
        let (pipeline, _context) = compile_stubbed(&data);
        assert_eq!(pipeline.state(), ControllerState::Constructed);
    }

    #[test]
    fn test_event_log_records() {
        let log = EventLog::new();
        let callback = log.callback();
        callback(ControllerEvent::Started);
        callback(ControllerEvent::Finished);
        assert_eq!(
            log.events(),
            vec![ControllerEvent::Started, ControllerEvent::Finished]
        );
    }
}
