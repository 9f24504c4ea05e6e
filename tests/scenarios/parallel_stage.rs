//! Test: parallel join semantics of stages

use crate::helpers::*;
use serde_json::json;
use stagehand::core::events::{EventCallback, Observer, Subscription};
use stagehand::core::state::{ControllerEvent, ControllerState};
use stagehand::{Controller, ControllerError, Name, StageController, StateDto, StopPolicy};
use std::sync::{Arc, Mutex};

#[test]
fn test_all_jobs_finishing_finishes_the_stage() {
    let data = pipeline_of_jobs(vec![
        json!({"name": "left", "steps": [{"name": "l", "set": 1, "variable": "left"}]}),
        json!({"name": "right", "steps": [{"name": "r", "set": 2, "variable": "right"}]}),
    ]);
    let (pipeline, context) = compile_stubbed(&data);

    pipeline.start().unwrap();

    assert_finished(&pipeline);
    assert_eq!(context.get_variable("left"), Some(json!(1)));
    assert_eq!(context.get_variable("right"), Some(json!(2)));
}

#[test]
fn test_one_failing_job_fails_the_stage_after_the_join() {
    let data = pipeline_of_jobs(vec![
        json!({"name": "good", "steps": [{"name": "g", "set": 1, "variable": "good"}]}),
        json!({"name": "bad", "steps": [{"name": "b", "assert": 1, "equals": 2}]}),
    ]);
    let (pipeline, context) = compile_stubbed(&data);

    pipeline.start().unwrap();

    assert_failed(&pipeline, "bad");
    // The sibling still ran to completion before the stage failed.
    assert_eq!(context.get_variable("good"), Some(json!(1)));

    let dto = pipeline.to_state();
    let jobs = dto.stages.unwrap()[0].jobs.clone().unwrap();
    assert_eq!(jobs[0].state, ControllerState::Finished.code());
    assert_eq!(jobs[1].state, ControllerState::Failed.code());
}

#[test]
fn test_failure_aggregation_names_every_failed_job() {
    let data = pipeline_of_jobs(vec![
        json!({"name": "bad-one", "steps": [{"name": "a", "assert": 1, "equals": 2}]}),
        json!({"name": "bad-two", "steps": [{"name": "b", "assert": 3, "equals": 4}]}),
    ]);
    let (pipeline, _context) = compile_stubbed(&data);

    pipeline.start().unwrap();

    assert_failed(&pipeline, "bad-one");
    assert_failed(&pipeline, "bad-two");
}

#[test]
fn test_parallel_writes_to_one_variable_are_last_write_wins() {
    // Two jobs target the same variable. There is no coordination: the
    // final value is whichever write lands last. With synchronous steps
    // the start order makes that deterministic.
    let data = pipeline_of_jobs(vec![
        json!({"name": "first", "steps": [{"name": "f", "set": "from-first", "variable": "shared"}]}),
        json!({"name": "second", "steps": [{"name": "s", "set": "from-second", "variable": "shared"}]}),
    ]);
    let (pipeline, context) = compile_stubbed(&data);

    pipeline.start().unwrap();

    assert_finished(&pipeline);
    assert_eq!(context.get_variable("shared"), Some(json!("from-second")));
}

/// Job stand-in that holds in STARTED and can be told to refuse any of
/// the lifecycle operations, like a job whose active step does not
/// support them.
struct HoldJob {
    name: Name,
    accepts_pause: bool,
    accepts_resume: bool,
    accepts_stop: bool,
    state: Mutex<ControllerState>,
    observer: Observer,
}

impl HoldJob {
    fn new(
        name: &str,
        accepts_pause: bool,
        accepts_resume: bool,
        accepts_stop: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: Name::new(name).unwrap(),
            accepts_pause,
            accepts_resume,
            accepts_stop,
            state: Mutex::new(ControllerState::Constructed),
            observer: Observer::new(),
        })
    }

    fn transition(&self, state: ControllerState, event: ControllerEvent) {
        *self.state.lock().unwrap() = state;
        self.observer.emit(event);
    }

    fn refuse(&self, operation: &'static str) -> ControllerError {
        ControllerError::Unsupported {
            name: self.name.to_string(),
            operation,
        }
    }
}

impl Controller for HoldJob {
    fn name(&self) -> &Name {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "stagehand.job"
    }

    fn state(&self) -> ControllerState {
        *self.state.lock().unwrap()
    }

    fn error(&self) -> Option<String> {
        None
    }

    fn start(&self) -> Result<(), ControllerError> {
        self.transition(ControllerState::Started, ControllerEvent::Started);
        Ok(())
    }

    fn pause(&self) -> Result<(), ControllerError> {
        if !self.accepts_pause {
            return Err(self.refuse("pause"));
        }
        self.transition(ControllerState::Paused, ControllerEvent::Paused);
        Ok(())
    }

    fn resume(&self) -> Result<(), ControllerError> {
        if !self.accepts_resume {
            return Err(self.refuse("resume"));
        }
        self.transition(ControllerState::Started, ControllerEvent::Resumed);
        Ok(())
    }

    fn stop(&self) -> Result<(), ControllerError> {
        if !self.accepts_stop {
            return Err(self.refuse("stop"));
        }
        self.transition(ControllerState::Cancelled, ControllerEvent::Cancelled);
        Ok(())
    }

    fn destroy(&self) -> Result<(), ControllerError> {
        self.transition(ControllerState::Cancelled, ControllerEvent::Cancelled);
        self.observer.clear();
        Ok(())
    }

    fn subscribe(&self, event: ControllerEvent, callback: EventCallback) -> Subscription {
        self.observer.subscribe(event, callback)
    }

    fn to_state(&self) -> StateDto {
        StateDto::leaf(self.kind(), &self.name, self.state(), None)
    }
}

fn stage_of(jobs: Vec<Arc<dyn Controller>>, policy: StopPolicy) -> StageController {
    StageController::new(Name::new("mixed").unwrap(), jobs, policy).unwrap()
}

#[test]
fn test_pause_tolerates_a_refusing_job() {
    let willing = HoldJob::new("willing", true, true, true);
    let refusing = HoldJob::new("refusing", false, false, false);
    let stage = stage_of(vec![willing.clone(), refusing.clone()], StopPolicy::default());

    stage.start().unwrap();
    stage.pause().unwrap();

    assert_eq!(willing.state(), ControllerState::Paused);
    // The refusing job keeps running, so the stage is not paused.
    assert_eq!(refusing.state(), ControllerState::Started);
    assert_eq!(stage.state(), ControllerState::Started);
}

#[test]
fn test_pause_with_every_job_refusing_errors() {
    let one = HoldJob::new("one", false, false, false);
    let two = HoldJob::new("two", false, false, false);
    let stage = stage_of(vec![one, two], StopPolicy::default());

    stage.start().unwrap();
    assert!(matches!(
        stage.pause(),
        Err(ControllerError::NoChildAccepted {
            operation: "pause",
            ..
        })
    ));
    assert_eq!(stage.state(), ControllerState::Started);
}

#[test]
fn test_resume_tolerates_a_refusing_job() {
    let willing = HoldJob::new("willing", true, true, true);
    let stuck = HoldJob::new("stuck", true, false, true);
    let stage = stage_of(vec![willing.clone(), stuck.clone()], StopPolicy::default());

    stage.start().unwrap();
    stage.pause().unwrap();
    assert_eq!(stage.state(), ControllerState::Paused);

    stage.resume().unwrap();
    assert_eq!(willing.state(), ControllerState::Started);
    assert_eq!(stuck.state(), ControllerState::Paused);
    assert_eq!(stage.state(), ControllerState::Started);
}

#[test]
fn test_resume_with_every_job_refusing_errors() {
    let one = HoldJob::new("one", true, false, true);
    let two = HoldJob::new("two", true, false, true);
    let stage = stage_of(vec![one, two], StopPolicy::default());

    stage.start().unwrap();
    stage.pause().unwrap();
    assert!(matches!(
        stage.resume(),
        Err(ControllerError::NoChildAccepted {
            operation: "resume",
            ..
        })
    ));
    assert_eq!(stage.state(), ControllerState::Paused);
}

#[test]
fn test_tolerant_stop_succeeds_past_a_refusing_job() {
    let willing = HoldJob::new("willing", true, true, true);
    let refusing = HoldJob::new("refusing", true, true, false);
    let stage = stage_of(vec![willing.clone(), refusing.clone()], StopPolicy::Tolerant);

    stage.start().unwrap();
    stage.stop().unwrap();

    assert_eq!(stage.state(), ControllerState::Cancelled);
    assert_eq!(willing.state(), ControllerState::Cancelled);
    assert_eq!(refusing.state(), ControllerState::Started);
}

#[test]
fn test_tolerant_stop_with_no_acceptance_errors() {
    let one = HoldJob::new("one", true, true, false);
    let two = HoldJob::new("two", true, true, false);
    let stage = stage_of(vec![one, two], StopPolicy::Tolerant);

    stage.start().unwrap();
    assert!(matches!(
        stage.stop(),
        Err(ControllerError::NoChildAccepted {
            operation: "stop",
            ..
        })
    ));
    // The stage still reports CANCELLED; the transition precedes the
    // downward delegation.
    assert_eq!(stage.state(), ControllerState::Cancelled);
}

#[test]
fn test_strict_stop_surfaces_the_first_refusal() {
    let refusing = HoldJob::new("refusing", true, true, false);
    let willing = HoldJob::new("willing", true, true, true);
    let stage = stage_of(vec![refusing.clone(), willing.clone()], StopPolicy::Strict);

    stage.start().unwrap();
    assert!(matches!(
        stage.stop(),
        Err(ControllerError::Unsupported {
            operation: "stop",
            ..
        })
    ));
    // Strict gives up at the first refusal; later jobs are not asked.
    assert_eq!(willing.state(), ControllerState::Started);
}

#[test]
fn test_all_jobs_failing_to_start_fails_the_stage() {
    // Commands compile to null under the stub system, so every job's
    // first step refuses to start.
    let data = pipeline_of_jobs(vec![
        json!({"name": "j1", "steps": [{"name": "a", "command": "${nope}"}]}),
        json!({"name": "j2", "steps": [{"name": "b", "command": "${also.nope}"}]}),
    ]);
    let (pipeline, _context) = compile_stubbed(&data);

    pipeline.start().unwrap();
    assert_failed(&pipeline, "wrong shape");
}
