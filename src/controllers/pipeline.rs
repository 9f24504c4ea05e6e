//! Pipeline controller - the root of the execution tree

use crate::controllers::controller::{Controller, StateDto};
use crate::controllers::sequence::SequenceCore;
use crate::core::error::{ControllerError, ModelError};
use crate::core::events::{EventCallback, Subscription};
use crate::core::model::kind;
use crate::core::name::Name;
use crate::core::state::{ControllerEvent, ControllerState};
use std::sync::Arc;

/// Runs its stages strictly one after another; each stage gates the
/// next.
#[derive(Clone)]
pub struct PipelineController {
    core: Arc<SequenceCore>,
}

impl PipelineController {
    pub fn new(name: Name, stages: Vec<Arc<dyn Controller>>) -> Result<Self, ModelError> {
        Ok(Self {
            core: SequenceCore::new(name, "pipeline", "stage", stages)?,
        })
    }
}

impl Controller for PipelineController {
    fn name(&self) -> &Name {
        self.core.name()
    }

    fn kind(&self) -> &'static str {
        kind::PIPELINE
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
        StateDto::leaf(self.kind(), self.name(), self.state(), self.error()).with_stages(
            self.core
                .children()
                .iter()
                .map(|stage| stage.to_state())
                .collect(),
        )
    }
}
