//! stagehand - a hierarchical pipeline execution engine
//!
//! A pipeline is a tree: the pipeline runs its stages sequentially,
//! each stage runs its jobs in parallel, and each job runs its steps
//! sequentially. Every node shares one lifecycle state machine and
//! reports progress through typed events; parents listen to their
//! children and derive their own state from what they hear.

pub mod cli;
pub mod controllers;
pub mod core;
pub mod runtime;
pub mod system;

pub use controllers::{
    Controller, JobController, PipelineController, StageController, StateDto, StopPolicy,
};
pub use core::{
    ControllerError, ControllerEvent, ControllerState, ModelError, Name, PipelineContext,
    PipelineModel, SharedContext, StepError, SystemError,
};
pub use runtime::{ControllerFactory, PipelineRegistry, PipelineRunner, RunnerOptions};
pub use system::{OsSystem, StubSystem, System};
