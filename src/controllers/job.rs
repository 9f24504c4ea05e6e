//! Job controller - a sequential run of steps

use crate::controllers::controller::{Controller, StateDto};
use crate::controllers::sequence::SequenceCore;
use crate::core::error::{ControllerError, ModelError};
use crate::core::events::{EventCallback, Subscription};
use crate::core::model::kind;
use crate::core::name::Name;
use crate::core::state::{ControllerEvent, ControllerState};
use std::sync::Arc;

/// Runs its steps strictly one after another; the first failing or
/// cancelled step ends the job.
#[derive(Clone)]
pub struct JobController {
    core: Arc<SequenceCore>,
}

impl JobController {
    pub fn new(name: Name, steps: Vec<Arc<dyn Controller>>) -> Result<Self, ModelError> {
        Ok(Self {
            core: SequenceCore::new(name, "job", "step", steps)?,
        })
    }
}

impl Controller for JobController {
    fn name(&self) -> &Name {
        self.core.name()
    }

    fn kind(&self) -> &'static str {
        kind::JOB
    }

    fn state(&self) -> ControllerState {
        self.core.state()
    }

    fn error(&self) -> Option<String> {
        self.core.error()
    }

    fn start(&self) -> Result<(), ControllerError> {
        self.core.start()
    }

    fn pause(&self) -> Result<(), ControllerError> {
        self.core.pause()
    }

    fn resume(&self) -> Result<(), ControllerError> {
        self.core.resume()
    }

    fn stop(&self) -> Result<(), ControllerError> {
        self.core.stop()
    }

    fn destroy(&self) -> Result<(), ControllerError> {
        self.core.destroy()
    }

    fn subscribe(&self, event: ControllerEvent, callback: EventCallback) -> Subscription {
        self.core.observer().subscribe(event, callback)
    }

    fn output_string(&self) -> String {
        self.core.output_string()
    }

    fn error_string(&self) -> String {
        self.core.error_string()
    }

    fn to_state(&self) -> StateDto {
        StateDto::leaf(self.kind(), self.name(), self.state(), self.error()).with_steps(
            self.core
                .children()
                .iter()
                .map(|step| step.to_state())
                .collect(),
        )
    }
}
