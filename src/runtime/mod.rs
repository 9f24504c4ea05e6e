//! Assembling and running pipelines

pub mod registry;
pub mod runner;

pub use registry::{ControllerFactory, PipelineRegistry};
pub use runner::{PipelineRunner, RunnerOptions};
