//! Typed publish/subscribe for controller state changes
//!
//! Each controller owns one [`Observer`]. Subscribing returns a
//! [`Subscription`] whose `unsubscribe` is idempotent: dropping a listener
//! twice is a no-op, never a double-free. Callbacks are always invoked
//! with no engine locks held, so a listener may call back into the tree.

use crate::core::state::ControllerEvent;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Callback invoked with the concrete event that fired
pub type EventCallback = Arc<dyn Fn(ControllerEvent) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: HashMap<u64, (ControllerEvent, EventCallback)>,
}

/// Per-node event dispatcher
#[derive(Default)]
pub struct Observer {
    table: Arc<Mutex<ListenerTable>>,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one event kind
    ///
    /// A listener registered for [`ControllerEvent::Changed`] receives
    /// every event the node emits.
    pub fn subscribe(&self, event: ControllerEvent, callback: EventCallback) -> Subscription {
        let mut table = self.table.lock().unwrap();
        let id = table.next_id;
        table.next_id += 1;
        table.listeners.insert(id, (event, callback));
        Subscription {
            table: Arc::downgrade(&self.table),
            id,
        }
    }

    /// Deliver an event to matching listeners
    ///
    /// Listener callbacks run after the table lock is released.
    pub fn emit(&self, event: ControllerEvent) {
        let targets: Vec<EventCallback> = {
            let table = self.table.lock().unwrap();
            table
                .listeners
                .values()
                .filter(|(kind, _)| *kind == event || *kind == ControllerEvent::Changed)
                .map(|(_, callback)| callback.clone())
                .collect()
        };
        for callback in targets {
            callback(event);
        }
    }

    /// Drop every listener; used by `destroy()`
    pub fn clear(&self) {
        self.table.lock().unwrap().listeners.clear();
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.table.lock().unwrap().listeners.len()
    }
}

/// Handle for removing one listener
pub struct Subscription {
    table: Weak<Mutex<ListenerTable>>,
    id: u64,
}

impl Subscription {
    /// Remove the listener; safe to call any number of times
    pub fn unsubscribe(&self) {
        if let Some(table) = self.table.upgrade() {
            table.lock().unwrap().listeners.remove(&self.id);
        }
    }
}
