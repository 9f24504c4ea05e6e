//! Function-backed step execution
//!
//! Most step types are plain computations over context variables. They
//! implement [`StepRunner`] and are driven by the generic
//! [`FnStepController`], which owns the lifecycle: compile the step's
//! templates at start, run the computation, write the result to the
//! output variable and finish. Pause, resume and stop are not supported
//! by function-backed steps.

use crate::controllers::controller::{Controller, Lifecycle, StateDto};
use crate::core::context::{PipelineContext, SharedContext};
use crate::core::error::{ControllerError, StepError};
use crate::core::events::{EventCallback, Observer, Subscription};
use crate::core::interpolate;
use crate::core::name::Name;
use crate::core::state::{ControllerEvent, ControllerState};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Result of running a compiled step
pub enum RunOutcome {
    /// The step completed synchronously
    Ready(Result<Value, StepError>),
    /// The step continues on the runtime; the controller stays STARTED
    /// until the future resolves
    Pending(Pin<Box<dyn Future<Output = Result<Value, StepError>> + Send>>),
}

/// One step type's computation, separated from lifecycle plumbing
pub trait StepRunner: Send + Sync + 'static {
    /// The step's inputs after template compilation and shape checks
    type Compiled: Send + 'static;

    fn kind(&self) -> &'static str;

    fn name(&self) -> &Name;

    /// Dotted variable path the result is written to, if any
    fn output_variable(&self) -> Option<&str>;

    fn compile(&self, context: &PipelineContext) -> Result<Self::Compiled, StepError>;

    fn run(&self, compiled: Self::Compiled) -> RunOutcome;
}

/// Generic controller for function-backed steps
pub struct FnStepController<R: StepRunner> {
    inner: Arc<FnStepInner<R>>,
}

impl<R: StepRunner> Clone for FnStepController<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct FnStepInner<R> {
    runner: R,
    context: SharedContext,
    observer: Observer,
    lifecycle: Mutex<Lifecycle>,
    output: Mutex<String>,
}

impl<R: StepRunner> FnStepController<R> {
    pub fn new(runner: R, context: SharedContext) -> Self {
        Self {
            inner: Arc::new(FnStepInner {
                runner,
                context,
                observer: Observer::new(),
                lifecycle: Mutex::new(Lifecycle::new()),
                output: Mutex::new(String::new()),
            }),
        }
    }
}

impl<R: StepRunner> FnStepInner<R> {
    fn complete(&self, result: Result<Value, StepError>) {
        match result {
            Ok(value) => {
                *self.output.lock().unwrap() = interpolate::value_to_string(&value);
                if let Some(variable) = self.runner.output_variable() {
                    self.context.set_variable(variable, value);
                }
                let emit = {
                    let mut lifecycle = self.lifecycle.lock().unwrap();
                    if lifecycle.state.is_terminal() {
                        false
                    } else {
                        lifecycle.state = ControllerState::Finished;
                        true
                    }
                };
                if emit {
                    self.observer.emit(ControllerEvent::Finished);
                }
            }
            Err(error) => {
                let emit = {
                    let mut lifecycle = self.lifecycle.lock().unwrap();
                    if lifecycle.state.is_terminal() {
                        false
                    } else {
                        lifecycle.fail(error.to_string());
                        true
                    }
                };
                if emit {
                    self.observer.emit(ControllerEvent::Failed);
                }
            }
        }
    }
}

impl<R: StepRunner> Controller for FnStepController<R> {
    fn name(&self) -> &Name {
        self.inner.runner.name()
    }

    fn kind(&self) -> &'static str {
        self.inner.runner.kind()
    }

    fn state(&self) -> ControllerState {
        self.inner.lifecycle.lock().unwrap().state
    }

    fn error(&self) -> Option<String> {
        self.inner.lifecycle.lock().unwrap().error.clone()
    }

    fn start(&self) -> Result<(), ControllerError> {
        let compiled = {
            let mut lifecycle = self.inner.lifecycle.lock().unwrap();
            lifecycle.expect(self.name(), "start", ControllerState::Constructed)?;
            // Compile before transitioning: a template or shape error is
            // a synchronous failure and the state machine never moves.
            match self.inner.runner.compile(&self.inner.context) {
                Ok(compiled) => {
                    lifecycle.state = ControllerState::Started;
                    compiled
                }
                Err(source) => {
                    return Err(ControllerError::Compile {
                        name: self.name().to_string(),
                        source,
                    })
                }
            }
        };
        self.inner.observer.emit(ControllerEvent::Started);

        match self.inner.runner.run(compiled) {
            RunOutcome::Ready(result) => self.inner.complete(result),
            RunOutcome::Pending(future) => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    let result = future.await;
                    inner.complete(result);
                });
            }
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), ControllerError> {
        Err(ControllerError::Unsupported {
            name: self.name().to_string(),
            operation: "pause",
        })
    }

    fn resume(&self) -> Result<(), ControllerError> {
        Err(ControllerError::Unsupported {
            name: self.name().to_string(),
            operation: "resume",
        })
    }

    fn stop(&self) -> Result<(), ControllerError> {
        Err(ControllerError::Unsupported {
            name: self.name().to_string(),
            operation: "stop",
        })
    }

    fn destroy(&self) -> Result<(), ControllerError> {
        let emit = {
            let mut lifecycle = self.inner.lifecycle.lock().unwrap();
            if lifecycle.state.is_terminal() {
                false
            } else {
                lifecycle.state = ControllerState::Cancelled;
                true
            }
        };
        if emit {
            self.inner.observer.emit(ControllerEvent::Cancelled);
        }
        self.inner.observer.clear();
        Ok(())
    }

    fn subscribe(&self, event: ControllerEvent, callback: EventCallback) -> Subscription {
        self.inner.observer.subscribe(event, callback)
    }

    fn output_string(&self) -> String {
        self.inner.output.lock().unwrap().clone()
    }

    fn to_state(&self) -> StateDto {
        StateDto::leaf(self.kind(), self.name(), self.state(), self.error())
    }
}
