//! Execution tree controllers

pub mod controller;
pub mod job;
mod parallel;
pub mod pipeline;
mod sequence;
pub mod stage;
pub mod step;

pub use controller::{Controller, StateDto};
pub use job::JobController;
pub use parallel::StopPolicy;
pub use pipeline::PipelineController;
pub use stage::StageController;
