//! The [`Controller`] trait - the uniform surface of every tree node

use crate::core::error::ControllerError;
use crate::core::events::{EventCallback, Subscription};
use crate::core::name::Name;
use crate::core::state::{ControllerEvent, ControllerState};
use serde::{Deserialize, Serialize};

/// A node in the execution tree: pipeline, stage, job or step
///
/// Handles are cheap to clone and share one underlying node. Lifecycle
/// operations are synchronous and return an error when called out of
/// turn; completion is reported through events, never a return value.
pub trait Controller: Send + Sync {
    fn name(&self) -> &Name;

    /// Dotted type identifier, see [`crate::core::model::kind`]
    fn kind(&self) -> &'static str;

    fn state(&self) -> ControllerState;

    /// Message describing why the node is [`ControllerState::Failed`]
    fn error(&self) -> Option<String>;

    fn start(&self) -> Result<(), ControllerError>;

    fn pause(&self) -> Result<(), ControllerError>;

    fn resume(&self) -> Result<(), ControllerError>;

    fn stop(&self) -> Result<(), ControllerError>;

    /// Tear the node down: cancel whatever is still running and drop
    /// every listener. Safe to call in any state, any number of times.
    fn destroy(&self) -> Result<(), ControllerError>;

    fn subscribe(&self, event: ControllerEvent, callback: EventCallback) -> Subscription;

    /// Serializable snapshot of this node and its descendants
    fn to_state(&self) -> StateDto;

    /// Listen to every event this node emits
    fn on_changed(&self, callback: EventCallback) -> Subscription {
        self.subscribe(ControllerEvent::Changed, callback)
    }

    /// Accumulated output text, for diagnostics; composites join their
    /// children's output with newlines
    fn output_string(&self) -> String {
        String::new()
    }

    /// Accumulated error text, for diagnostics
    fn error_string(&self) -> String {
        self.error().unwrap_or_default()
    }

    fn is_started(&self) -> bool {
        self.state().is_started()
    }

    fn is_paused(&self) -> bool {
        self.state().is_paused()
    }

    fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    fn is_cancelled(&self) -> bool {
        self.state().is_cancelled()
    }

    fn is_failed(&self) -> bool {
        self.state().is_failed()
    }

    fn is_successful(&self) -> bool {
        self.state().is_successful()
    }
}

/// Point-in-time snapshot of a subtree, shaped for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub state: i8,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<StateDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<StateDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StateDto>>,
}

impl StateDto {
    pub fn leaf(kind: &str, name: &Name, state: ControllerState, error: Option<String>) -> Self {
        Self {
            kind: kind.to_string(),
            state: state.code(),
            name: name.to_string(),
            error,
            stages: None,
            jobs: None,
            steps: None,
        }
    }

    pub fn with_stages(mut self, stages: Vec<StateDto>) -> Self {
        self.stages = Some(stages);
        self
    }

    pub fn with_jobs(mut self, jobs: Vec<StateDto>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn with_steps(mut self, steps: Vec<StateDto>) -> Self {
        self.steps = Some(steps);
        self
    }
}

/// Join non-empty diagnostic strings with newlines
pub(crate) fn join_nonempty(parts: impl Iterator<Item = String>) -> String {
    parts
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Mutable lifecycle kernel shared by concrete controllers; always lives
/// behind the owning controller's lock.
pub(crate) struct Lifecycle {
    pub state: ControllerState,
    pub error: Option<String>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Constructed,
            error: None,
        }
    }

    /// Guard an operation that is only legal in one state
    pub fn expect(
        &self,
        name: &Name,
        operation: &'static str,
        expected: ControllerState,
    ) -> Result<(), ControllerError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ControllerError::IllegalState {
                name: name.to_string(),
                operation,
                state: self.state,
            })
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = ControllerState::Failed;
        self.error = Some(message.into());
    }
}
