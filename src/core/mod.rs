//! Core engine types: states, events, errors, models and the run context

pub mod context;
pub mod error;
pub mod events;
pub mod interpolate;
pub mod model;
pub mod name;
pub mod state;

pub use context::{PipelineContext, SharedContext};
pub use error::{ControllerError, ModelError, StepError, SystemError};
pub use events::{EventCallback, Observer, Subscription};
pub use model::{
    JobModel, ParameterModel, PipelineModel, StageModel, StepModel,
};
pub use name::Name;
pub use state::{ControllerEvent, ControllerState};
