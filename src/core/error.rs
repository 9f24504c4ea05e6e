//! Engine error types

use crate::core::state::ControllerState;
use thiserror::Error;

/// Structural errors in the declarative model tree
///
/// These are fatal: they surface synchronously at parse or construction
/// time and are never retried.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid name {0:?}: a name must be non-empty and contain no whitespace")]
    InvalidName(String),

    #[error("expected a JSON object for {0}")]
    NotAnObject(&'static str),

    #[error("{kind} is missing required field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("{kind} field '{field}' has the wrong shape: expected {expected}")]
    InvalidField {
        kind: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{kind} '{name}' must have at least one {child}")]
    Empty {
        kind: &'static str,
        name: String,
        child: &'static str,
    },

    #[error("unknown step type: {0}")]
    UnknownStepType(String),

    #[error("factory for '{expected}' was handed a '{found}' model")]
    FactoryMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors surfaced synchronously by controller operations
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{name}: cannot {operation} while in state {state:?}")]
    IllegalState {
        name: String,
        operation: &'static str,
        state: ControllerState,
    },

    #[error("{name}: {operation} is not supported by this step type")]
    Unsupported {
        name: String,
        operation: &'static str,
    },

    /// Template compilation failed at `start()`; the state machine never
    /// transitions, this is a pre-FAILED synchronous error.
    #[error("{name}: {source}")]
    Compile {
        name: String,
        #[source]
        source: StepError,
    },

    #[error("{name}: {source}")]
    System {
        name: String,
        #[source]
        source: SystemError,
    },

    #[error("{name}: every child failed to {operation}")]
    NoChildAccepted {
        name: String,
        operation: &'static str,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Step-level errors, both compile-time (shape mismatches after
/// interpolation) and runtime (failed actions)
#[derive(Debug, Error)]
pub enum StepError {
    #[error("compiled {what} has the wrong shape: expected {expected}, got {got}")]
    Shape {
        what: String,
        expected: &'static str,
        got: String,
    },

    #[error("unknown action {action:?} for {kind} step")]
    UnknownAction { kind: &'static str, action: String },

    #[error("missing {what}")]
    Missing { what: String },

    #[error("assertion failed: {actual} is not equal to {expected}")]
    AssertMismatch { actual: String, expected: String },

    #[error("json {action} failed: {source}")]
    Json {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("csv parse failed: {0}")]
    Csv(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error(transparent)]
    System(#[from] SystemError),
}

/// Errors from the system execution backend
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("process already started")]
    AlreadyStarted,

    #[error("process has not been started")]
    NotStarted,

    #[error("failed to signal process: {0}")]
    Signal(String),

    #[error("not supported by this system backend")]
    Unsupported,
}
