//! Stage controller - jobs running in parallel

use crate::controllers::controller::{Controller, StateDto};
use crate::controllers::parallel::{ParallelCore, StopPolicy};
use crate::core::error::{ControllerError, ModelError};
use crate::core::events::{EventCallback, Subscription};
use crate::core::model::kind;
use crate::core::name::Name;
use crate::core::state::{ControllerEvent, ControllerState};
use std::sync::Arc;

/// Starts all of its jobs together and joins on their completion.
/// Failure of any job fails the stage once every job has ended.
#[derive(Clone)]
pub struct StageController {
    core: Arc<ParallelCore>,
}

impl StageController {
    pub fn new(
        name: Name,
        jobs: Vec<Arc<dyn Controller>>,
        policy: StopPolicy,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            core: ParallelCore::new(name, "stage", "job", jobs, policy)?,
        })
    }
}

impl Controller for StageController {
    fn name(&self) -> &Name {
        self.core.name()
    }

    fn kind(&self) -> &'static str {
        kind::STAGE
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
        StateDto::leaf(self.kind(), self.name(), self.state(), self.error()).with_jobs(
            self.core
                .children()
                .iter()
                .map(|job| job.to_state())
                .collect(),
        )
    }
}
