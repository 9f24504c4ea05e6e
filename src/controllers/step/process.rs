//! Process-backed step execution
//!
//! Steps that run an external program implement [`CommandPlanner`] and
//! are driven by [`ProcessStepController`]. Unlike function-backed
//! steps these support pause, resume and stop, mapped onto process
//! signals by the system backend. Completion is reported by the
//! process exit callback: exit code zero finishes the step and captures
//! stdout as its output, anything else fails it.

use crate::controllers::controller::{Controller, Lifecycle, StateDto};
use crate::core::context::{PipelineContext, SharedContext};
use crate::core::error::{ControllerError, StepError};
use crate::core::events::{EventCallback, Observer, Subscription};
use crate::core::name::Name;
use crate::core::state::{ControllerEvent, ControllerState};
use crate::system::{ProcessOptions, SystemProcess};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

/// A fully compiled process invocation
#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

/// One process step type's planning, separated from lifecycle plumbing
pub trait CommandPlanner: Send + Sync + 'static {
    fn kind(&self) -> &'static str;

    fn name(&self) -> &Name;

    /// Dotted variable path stdout is written to on success, if any
    fn output_variable(&self) -> Option<&str>;

    fn compile(&self, context: &PipelineContext) -> Result<ProcessSpec, StepError>;
}

/// Generic controller for process-backed steps
pub struct ProcessStepController<P: CommandPlanner> {
    inner: Arc<ProcessInner<P>>,
}

impl<P: CommandPlanner> Clone for ProcessStepController<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ProcessInner<P> {
    planner: P,
    context: SharedContext,
    observer: Observer,
    state: Mutex<ProcessState>,
}

struct ProcessState {
    lifecycle: Lifecycle,
    process: Option<Arc<dyn SystemProcess>>,
}

impl<P: CommandPlanner> ProcessStepController<P> {
    pub fn new(planner: P, context: SharedContext) -> Self {
        Self {
            inner: Arc::new(ProcessInner {
                planner,
                context,
                observer: Observer::new(),
                state: Mutex::new(ProcessState {
                    lifecycle: Lifecycle::new(),
                    process: None,
                }),
            }),
        }
    }

    fn with_process(
        &self,
        operation: &'static str,
        expected: ControllerState,
    ) -> Result<Arc<dyn SystemProcess>, ControllerError> {
        let st = self.inner.state.lock().unwrap();
        st.lifecycle.expect(self.name(), operation, expected)?;
        st.process.clone().ok_or(ControllerError::IllegalState {
            name: self.name().to_string(),
            operation,
            state: st.lifecycle.state,
        })
    }
}

impl<P: CommandPlanner> ProcessInner<P> {
    fn handle_exit(&self, status: Option<i32>) {
        let process = { self.state.lock().unwrap().process.clone() };
        let Some(process) = process else { return };

        if status == Some(0) {
            if let Some(variable) = self.planner.output_variable() {
                let output = process.output_string();
                self.context
                    .set_variable(variable, Value::String(output.trim_end().to_string()));
            }
            let emit = {
                let mut st = self.state.lock().unwrap();
                if st.lifecycle.state.is_terminal() {
                    false
                } else {
                    st.lifecycle.state = ControllerState::Finished;
                    true
                }
            };
            if emit {
                self.observer.emit(ControllerEvent::Finished);
            }
        } else {
            let stderr = process.error_string();
            let message = match status {
                Some(code) => format!("process exited with code {code}: {}", stderr.trim()),
                None => format!("process terminated by signal: {}", stderr.trim()),
            };
            let emit = {
                let mut st = self.state.lock().unwrap();
                if st.lifecycle.state.is_terminal() {
                    false
                } else {
                    st.lifecycle.fail(message);
                    true
                }
            };
            if emit {
                self.observer.emit(ControllerEvent::Failed);
            }
        }
    }
}

impl<P: CommandPlanner> Controller for ProcessStepController<P> {
    fn name(&self) -> &Name {
        self.inner.planner.name()
    }

    fn kind(&self) -> &'static str {
        self.inner.planner.kind()
    }

    fn state(&self) -> ControllerState {
        self.inner.state.lock().unwrap().lifecycle.state
    }

    fn error(&self) -> Option<String> {
        self.inner.state.lock().unwrap().lifecycle.error.clone()
    }

    fn start(&self) -> Result<(), ControllerError> {
        let spec = {
            let st = self.inner.state.lock().unwrap();
            st.lifecycle
                .expect(self.name(), "start", ControllerState::Constructed)?;
            match self.inner.planner.compile(&self.inner.context) {
                Ok(spec) => spec,
                Err(source) => {
                    return Err(ControllerError::Compile {
                        name: self.name().to_string(),
                        source,
                    })
                }
            }
        };
        let process = self
            .inner
            .context
            .system()
            .create_process(ProcessOptions {
                command: spec.command,
                args: spec.args,
                env: spec.env,
                cwd: spec.cwd,
            })
            .map_err(|source| ControllerError::System {
                name: self.name().to_string(),
                source,
            })?;
        {
            let mut st = self.inner.state.lock().unwrap();
            st.lifecycle.state = ControllerState::Started;
            st.process = Some(Arc::clone(&process));
        }
        let weak: Weak<ProcessInner<P>> = Arc::downgrade(&self.inner);
        process.on_exit(Box::new(move |status| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_exit(status);
            }
        }));
        self.inner.observer.emit(ControllerEvent::Started);

        if let Err(source) = process.start() {
            let emit = {
                let mut st = self.inner.state.lock().unwrap();
                if st.lifecycle.state.is_terminal() {
                    false
                } else {
                    st.lifecycle.fail(source.to_string());
                    true
                }
            };
            if emit {
                self.inner.observer.emit(ControllerEvent::Failed);
            }
            return Err(ControllerError::System {
                name: self.name().to_string(),
                source,
            });
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), ControllerError> {
        let process = self.with_process("pause", ControllerState::Started)?;
        process.pause().map_err(|source| ControllerError::System {
            name: self.name().to_string(),
            source,
        })?;
        let emit = {
            let mut st = self.inner.state.lock().unwrap();
            if st.lifecycle.state == ControllerState::Started {
                st.lifecycle.state = ControllerState::Paused;
                true
            } else {
                false
            }
        };
        if emit {
            self.inner.observer.emit(ControllerEvent::Paused);
        }
        Ok(())
    }

    fn resume(&self) -> Result<(), ControllerError> {
        let process = self.with_process("resume", ControllerState::Paused)?;
        process.resume().map_err(|source| ControllerError::System {
            name: self.name().to_string(),
            source,
        })?;
        let emit = {
            let mut st = self.inner.state.lock().unwrap();
            if st.lifecycle.state == ControllerState::Paused {
                st.lifecycle.state = ControllerState::Started;
                true
            } else {
                false
            }
        };
        if emit {
            self.inner.observer.emit(ControllerEvent::Resumed);
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), ControllerError> {
        let process = self.with_process("stop", ControllerState::Started)?;
        process.stop().map_err(|source| ControllerError::System {
            name: self.name().to_string(),
            source,
        })?;
        // Transition now; the later exit callback sees a terminal state
        // and is ignored.
        let emit = {
            let mut st = self.inner.state.lock().unwrap();
            if st.lifecycle.state.is_terminal() {
                false
            } else {
                st.lifecycle.state = ControllerState::Cancelled;
                true
            }
        };
        if emit {
            self.inner.observer.emit(ControllerEvent::Cancelled);
        }
        Ok(())
    }

    fn destroy(&self) -> Result<(), ControllerError> {
        let (emit, process) = {
            let mut st = self.inner.state.lock().unwrap();
            if st.lifecycle.state.is_terminal() {
                (false, None)
            } else {
                let was_paused = st.lifecycle.state == ControllerState::Paused;
                let running = matches!(
                    st.lifecycle.state,
                    ControllerState::Started | ControllerState::Paused
                );
                st.lifecycle.state = ControllerState::Cancelled;
                let process = if running { st.process.clone() } else { None };
                (true, process.map(|process| (process, was_paused)))
            }
        };
        if let Some((process, was_paused)) = process {
            if was_paused {
                // A stopped process cannot handle termination signals.
                process.resume().ok();
            }
            process.stop().ok();
        }
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
        let st = self.inner.state.lock().unwrap();
        st.process
            .as_ref()
            .map(|process| process.output_string())
            .unwrap_or_default()
    }

    fn error_string(&self) -> String {
        let st = self.inner.state.lock().unwrap();
        let stderr = st
            .process
            .as_ref()
            .map(|process| process.error_string())
            .unwrap_or_default();
        if stderr.is_empty() {
            st.lifecycle.error.clone().unwrap_or_default()
        } else {
            stderr
        }
    }

    fn to_state(&self) -> StateDto {
        StateDto::leaf(self.kind(), self.name(), self.state(), self.error())
    }
}
