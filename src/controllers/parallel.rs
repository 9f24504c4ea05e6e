//! Parallel aggregation used by stages
//!
//! All children start together and the node's state is re-derived from
//! the full set of child states on every child event. Terminal
//! aggregation is a join: the node ends once every child has ended, with
//! failure taking precedence over cancellation over success.

use crate::controllers::controller::{join_nonempty, Controller, Lifecycle};
use crate::core::error::ControllerError;
use crate::core::error::ModelError;
use crate::core::events::{Observer, Subscription};
use crate::core::name::Name;
use crate::core::state::{ControllerEvent, ControllerState};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// How a stage treats children that refuse to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// `stop()` succeeds as long as at least one child accepted it
    #[default]
    Tolerant,
    /// `stop()` fails on the first child that refuses
    Strict,
}

pub(crate) struct ParallelCore {
    name: Name,
    children: Vec<Arc<dyn Controller>>,
    observer: Observer,
    policy: StopPolicy,
    state: Mutex<ParallelState>,
}

struct ParallelState {
    lifecycle: Lifecycle,
    subscriptions: Vec<Subscription>,
    // Children whose start() failed synchronously never emit events;
    // they count as failed during aggregation.
    failed_start: Vec<bool>,
}

impl ParallelCore {
    pub fn new(
        name: Name,
        kind: &'static str,
        child_noun: &'static str,
        children: Vec<Arc<dyn Controller>>,
        policy: StopPolicy,
    ) -> Result<Arc<Self>, ModelError> {
        if children.is_empty() {
            return Err(ModelError::Empty {
                kind,
                name: name.to_string(),
                child: child_noun,
            });
        }
        let count = children.len();
        Ok(Arc::new(Self {
            name,
            children,
            observer: Observer::new(),
            policy,
            state: Mutex::new(ParallelState {
                lifecycle: Lifecycle::new(),
                subscriptions: Vec::new(),
                failed_start: vec![false; count],
            }),
        }))
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn children(&self) -> &[Arc<dyn Controller>] {
        &self.children
    }

    pub fn state(&self) -> ControllerState {
        self.state.lock().unwrap().lifecycle.state
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().unwrap().lifecycle.error.clone()
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn output_string(&self) -> String {
        join_nonempty(self.children.iter().map(|child| child.output_string()))
    }

    pub fn error_string(&self) -> String {
        join_nonempty(self.children.iter().map(|child| child.error_string()))
    }

    pub fn start(self: &Arc<Self>) -> Result<(), ControllerError> {
        {
            let mut st = self.state.lock().unwrap();
            st.lifecycle
                .expect(&self.name, "start", ControllerState::Constructed)?;
            st.lifecycle.state = ControllerState::Started;
            st.subscriptions = self
                .children
                .iter()
                .map(|child| {
                    let weak = Arc::downgrade(self);
                    child.on_changed(Arc::new(move |_event| {
                        if let Some(core) = weak.upgrade() {
                            core.evaluate();
                        }
                    }))
                })
                .collect();
        }
        self.observer.emit(ControllerEvent::Started);

        for (index, child) in self.children.iter().enumerate() {
            if let Err(error) = child.start() {
                warn!(node = %self.name, child = %child.name(), %error, "child failed to start");
                self.state.lock().unwrap().failed_start[index] = true;
            }
        }
        // Children may have reached terminal states synchronously during
        // the loop; failed starts alone produce no events at all.
        self.evaluate();
        Ok(())
    }

    /// Re-derive this node's state from the full set of child states
    fn evaluate(&self) {
        let (event, subscriptions) = {
            let mut st = self.state.lock().unwrap();
            if st.lifecycle.state.is_terminal()
                || st.lifecycle.state == ControllerState::Constructed
            {
                return;
            }
            let effective: Vec<ControllerState> = self
                .children
                .iter()
                .enumerate()
                .map(|(index, child)| {
                    if st.failed_start[index] {
                        ControllerState::Failed
                    } else {
                        child.state()
                    }
                })
                .collect();

            if effective.iter().all(|state| state.is_terminal()) {
                let event = if effective.iter().any(|state| state.is_failed()) {
                    let message = self.aggregate_errors(&st.failed_start);
                    st.lifecycle.fail(message);
                    ControllerEvent::Failed
                } else if effective.iter().any(|state| state.is_cancelled()) {
                    st.lifecycle.state = ControllerState::Cancelled;
                    ControllerEvent::Cancelled
                } else {
                    st.lifecycle.state = ControllerState::Finished;
                    ControllerEvent::Finished
                };
                let subscriptions = std::mem::take(&mut st.subscriptions);
                (event, subscriptions)
            } else if st.lifecycle.state == ControllerState::Started
                && effective.iter().any(|state| state.is_paused())
                && !effective.iter().any(|state| state.is_started())
            {
                st.lifecycle.state = ControllerState::Paused;
                (ControllerEvent::Paused, Vec::new())
            } else if st.lifecycle.state == ControllerState::Paused
                && effective.iter().any(|state| state.is_started())
            {
                st.lifecycle.state = ControllerState::Started;
                (ControllerEvent::Resumed, Vec::new())
            } else {
                return;
            }
        };
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        self.observer.emit(event);
    }

    fn aggregate_errors(&self, failed_start: &[bool]) -> String {
        let mut parts = Vec::new();
        for (index, child) in self.children.iter().enumerate() {
            if failed_start[index] {
                parts.push(format!("{}: failed to start", child.name()));
            } else if child.is_failed() {
                let message = child.error().unwrap_or_else(|| "failed".to_string());
                parts.push(format!("{}: {message}", child.name()));
            }
        }
        parts.join("; ")
    }

    pub fn pause(&self) -> Result<(), ControllerError> {
        self.broadcast("pause", |child| child.pause())
    }

    pub fn resume(&self) -> Result<(), ControllerError> {
        {
            let st = self.state.lock().unwrap();
            st.lifecycle
                .expect(&self.name, "resume", ControllerState::Paused)?;
        }
        let mut accepted = 0;
        for child in &self.children {
            if child.is_terminal() {
                continue;
            }
            match child.resume() {
                Ok(()) => accepted += 1,
                Err(error) => {
                    warn!(node = %self.name, child = %child.name(), %error, "child refused to resume");
                }
            }
        }
        if accepted == 0 {
            return Err(ControllerError::NoChildAccepted {
                name: self.name.to_string(),
                operation: "resume",
            });
        }
        Ok(())
    }

    fn broadcast(
        &self,
        operation: &'static str,
        act: impl Fn(&Arc<dyn Controller>) -> Result<(), ControllerError>,
    ) -> Result<(), ControllerError> {
        {
            let st = self.state.lock().unwrap();
            st.lifecycle
                .expect(&self.name, operation, ControllerState::Started)?;
        }
        let mut accepted = 0;
        for child in &self.children {
            if child.is_terminal() {
                continue;
            }
            match act(child) {
                Ok(()) => accepted += 1,
                Err(error) => {
                    warn!(node = %self.name, child = %child.name(), %error, "child refused operation");
                }
            }
        }
        if accepted == 0 {
            return Err(ControllerError::NoChildAccepted {
                name: self.name.to_string(),
                operation,
            });
        }
        Ok(())
    }

    pub fn stop(&self) -> Result<(), ControllerError> {
        let subscriptions = {
            let mut st = self.state.lock().unwrap();
            st.lifecycle
                .expect(&self.name, "stop", ControllerState::Started)?;
            st.lifecycle.state = ControllerState::Cancelled;
            std::mem::take(&mut st.subscriptions)
        };
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        self.observer.emit(ControllerEvent::Cancelled);

        let mut attempted = 0;
        let mut accepted = 0;
        let mut first_error = None;
        for child in &self.children {
            if child.is_terminal() {
                continue;
            }
            attempted += 1;
            match child.stop() {
                Ok(()) => accepted += 1,
                Err(error) => {
                    warn!(node = %self.name, child = %child.name(), %error, "child refused to stop");
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                    if self.policy == StopPolicy::Strict {
                        break;
                    }
                }
            }
        }
        match (self.policy, first_error) {
            (StopPolicy::Strict, Some(error)) => Err(error),
            // Tolerant only reports failure when no child accepted.
            (StopPolicy::Tolerant, Some(_)) if attempted > 0 && accepted == 0 => {
                Err(ControllerError::NoChildAccepted {
                    name: self.name.to_string(),
                    operation: "stop",
                })
            }
            _ => Ok(()),
        }
    }

    pub fn destroy(&self) -> Result<(), ControllerError> {
        let was_terminal = {
            let mut st = self.state.lock().unwrap();
            let was_terminal = st.lifecycle.state.is_terminal();
            if !was_terminal {
                st.lifecycle.state = ControllerState::Cancelled;
            }
            was_terminal
        };
        let subscriptions = {
            let mut st = self.state.lock().unwrap();
            std::mem::take(&mut st.subscriptions)
        };
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        if !was_terminal {
            self.observer.emit(ControllerEvent::Cancelled);
            for child in &self.children {
                if child.is_paused() {
                    child.resume().ok();
                }
                if !child.is_terminal() {
                    if let Err(error) = child.destroy() {
                        warn!(node = %self.name, child = %child.name(), %error, "child failed to tear down");
                    }
                }
            }
        }
        self.observer.clear();
        Ok(())
    }
}
