//! Sequential aggregation shared by jobs and pipelines
//!
//! A sequence runs its children strictly one at a time and derives its
//! own state from the active child. Advancement is event-driven: the
//! sequence listens to every child and reacts when the active one
//! reaches a terminal state. Decisions are taken under the node lock and
//! acted on after it is released, so child callbacks may re-enter the
//! tree freely.

use crate::controllers::controller::{join_nonempty, Controller, Lifecycle};
use crate::core::error::ControllerError;
use crate::core::error::ModelError;
use crate::core::events::{Observer, Subscription};
use crate::core::name::Name;
use crate::core::state::{ControllerEvent, ControllerState};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub(crate) struct SequenceCore {
    name: Name,
    children: Vec<Arc<dyn Controller>>,
    observer: Observer,
    state: Mutex<SequenceState>,
}

struct SequenceState {
    lifecycle: Lifecycle,
    current: usize,
    subscriptions: Vec<Option<Subscription>>,
}

/// What to do after releasing the node lock
enum Reaction {
    Ignore,
    Emit(ControllerEvent),
    Advance { resumed: bool, next: usize },
}

impl SequenceCore {
    pub fn new(
        name: Name,
        kind: &'static str,
        child_noun: &'static str,
        children: Vec<Arc<dyn Controller>>,
    ) -> Result<Arc<Self>, ModelError> {
        if children.is_empty() {
            return Err(ModelError::Empty {
                kind,
                name: name.to_string(),
                child: child_noun,
            });
        }
        Ok(Arc::new(Self {
            name,
            children,
            observer: Observer::new(),
            state: Mutex::new(SequenceState {
                lifecycle: Lifecycle::new(),
                current: 0,
                subscriptions: Vec::new(),
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
            // Subscribe to every child up front; events from children
            // other than the active one are filtered by index.
            st.subscriptions = self
                .children
                .iter()
                .enumerate()
                .map(|(index, child)| {
                    let weak = Arc::downgrade(self);
                    Some(child.on_changed(Arc::new(move |event| {
                        if let Some(core) = weak.upgrade() {
                            core.handle_child_changed(index, event);
                        }
                    })))
                })
                .collect();
        }
        self.observer.emit(ControllerEvent::Started);

        let first = Arc::clone(&self.children[0]);
        if let Err(error) = first.start() {
            debug!(node = %self.name, %error, "first child failed to start");
            self.fail_with(error.to_string());
        }
        Ok(())
    }

    fn handle_child_changed(self: &Arc<Self>, index: usize, event: ControllerEvent) {
        let mut retired: Option<Subscription> = None;
        let reaction = {
            let mut st = self.state.lock().unwrap();
            if st.lifecycle.state.is_terminal() || index != st.current {
                Reaction::Ignore
            } else {
                match event {
                    ControllerEvent::Failed => {
                        retired = st.subscriptions[index].take();
                        let message = self.children[index]
                            .error()
                            .unwrap_or_else(|| "child failed".to_string());
                        st.lifecycle
                            .fail(format!("{}: {message}", self.children[index].name()));
                        Reaction::Emit(ControllerEvent::Failed)
                    }
                    ControllerEvent::Cancelled => {
                        retired = st.subscriptions[index].take();
                        st.lifecycle.state = ControllerState::Cancelled;
                        Reaction::Emit(ControllerEvent::Cancelled)
                    }
                    ControllerEvent::Finished => {
                        retired = st.subscriptions[index].take();
                        if index + 1 < self.children.len() {
                            let resumed = st.lifecycle.state == ControllerState::Paused;
                            st.lifecycle.state = ControllerState::Started;
                            st.current = index + 1;
                            Reaction::Advance {
                                resumed,
                                next: index + 1,
                            }
                        } else {
                            st.lifecycle.state = ControllerState::Finished;
                            Reaction::Emit(ControllerEvent::Finished)
                        }
                    }
                    ControllerEvent::Paused
                        if st.lifecycle.state == ControllerState::Started =>
                    {
                        st.lifecycle.state = ControllerState::Paused;
                        Reaction::Emit(ControllerEvent::Paused)
                    }
                    ControllerEvent::Started | ControllerEvent::Resumed
                        if st.lifecycle.state == ControllerState::Paused =>
                    {
                        st.lifecycle.state = ControllerState::Started;
                        Reaction::Emit(ControllerEvent::Resumed)
                    }
                    _ => Reaction::Ignore,
                }
            }
        };
        if let Some(subscription) = retired {
            subscription.unsubscribe();
        }

        match reaction {
            Reaction::Ignore => {}
            Reaction::Emit(event) => self.observer.emit(event),
            Reaction::Advance { resumed, next } => {
                if resumed {
                    self.observer.emit(ControllerEvent::Resumed);
                }
                let child = Arc::clone(&self.children[next]);
                if let Err(error) = child.start() {
                    debug!(node = %self.name, child = %child.name(), %error, "child failed to start");
                    self.fail_with(error.to_string());
                }
            }
        }
    }

    /// Mark the node failed unless it already reached a terminal state
    fn fail_with(&self, message: String) {
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
            self.drain_subscriptions();
            self.observer.emit(ControllerEvent::Failed);
        }
    }

    pub fn pause(&self) -> Result<(), ControllerError> {
        let current = {
            let st = self.state.lock().unwrap();
            st.lifecycle
                .expect(&self.name, "pause", ControllerState::Started)?;
            st.current
        };
        // Delegate first: a pausable child bubbles the transition back
        // up through its events.
        let child = Arc::clone(&self.children[current]);
        if child.pause().is_ok() {
            return Ok(());
        }
        let emit = {
            let mut st = self.state.lock().unwrap();
            if st.lifecycle.state == ControllerState::Started {
                st.lifecycle.state = ControllerState::Paused;
                true
            } else {
                false
            }
        };
        if emit {
            self.observer.emit(ControllerEvent::Paused);
        }
        Ok(())
    }

    pub fn resume(&self) -> Result<(), ControllerError> {
        let current = {
            let st = self.state.lock().unwrap();
            st.lifecycle
                .expect(&self.name, "resume", ControllerState::Paused)?;
            st.current
        };
        let child = Arc::clone(&self.children[current]);
        if child.is_paused() && child.resume().is_ok() {
            return Ok(());
        }
        let emit = {
            let mut st = self.state.lock().unwrap();
            if st.lifecycle.state == ControllerState::Paused {
                st.lifecycle.state = ControllerState::Started;
                true
            } else {
                false
            }
        };
        if emit {
            self.observer.emit(ControllerEvent::Resumed);
        }
        Ok(())
    }

    pub fn stop(&self) -> Result<(), ControllerError> {
        let current = {
            let mut st = self.state.lock().unwrap();
            st.lifecycle
                .expect(&self.name, "stop", ControllerState::Started)?;
            st.lifecycle.state = ControllerState::Cancelled;
            st.current
        };
        // Transition before delegating so late child events are ignored.
        self.drain_subscriptions();
        self.observer.emit(ControllerEvent::Cancelled);

        let child = Arc::clone(&self.children[current]);
        if !child.is_terminal() {
            if let Err(error) = child.stop() {
                warn!(node = %self.name, child = %child.name(), %error, "child refused to stop");
            }
        }
        Ok(())
    }

    pub fn destroy(&self) -> Result<(), ControllerError> {
        let (was_terminal, current) = {
            let mut st = self.state.lock().unwrap();
            let was_terminal = st.lifecycle.state.is_terminal();
            if !was_terminal {
                st.lifecycle.state = ControllerState::Cancelled;
            }
            (was_terminal, st.current)
        };
        self.drain_subscriptions();
        if !was_terminal {
            self.observer.emit(ControllerEvent::Cancelled);
            let child = Arc::clone(&self.children[current]);
            if child.is_paused() {
                // A stopped process cannot handle termination signals.
                child.resume().ok();
            }
            if !child.is_terminal() {
                if let Err(error) = child.destroy() {
                    warn!(node = %self.name, child = %child.name(), %error, "child failed to tear down");
                }
            }
        }
        self.observer.clear();
        Ok(())
    }

    fn drain_subscriptions(&self) {
        let subscriptions = {
            let mut st = self.state.lock().unwrap();
            std::mem::take(&mut st.subscriptions)
        };
        for subscription in subscriptions.into_iter().flatten() {
            subscription.unsubscribe();
        }
    }
}
