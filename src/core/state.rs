//! Controller lifecycle states and events

use serde::{Deserialize, Serialize};

/// Lifecycle state shared by every controller in the tree
///
/// Terminal states are final; operations called out of turn fail
/// synchronously with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerState {
    /// Placeholder for a node that has not finished construction
    Unconstructed,
    /// Constructed but not yet started
    Constructed,
    /// Actively running
    Started,
    /// Suspended; may be resumed
    Paused,
    /// Stopped before completion (terminal)
    Cancelled,
    /// Completed successfully (terminal)
    Finished,
    /// Completed with an error (terminal)
    Failed,
}

impl ControllerState {
    /// Numeric code used in state DTOs
    pub fn code(self) -> i8 {
        match self {
            ControllerState::Unconstructed => -1,
            ControllerState::Constructed => 0,
            ControllerState::Started => 1,
            ControllerState::Paused => 2,
            ControllerState::Cancelled => 3,
            ControllerState::Finished => 4,
            ControllerState::Failed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ControllerState::Cancelled | ControllerState::Finished | ControllerState::Failed
        )
    }

    pub fn is_running(self) -> bool {
        self == ControllerState::Started
    }

    pub fn is_started(self) -> bool {
        self.is_running()
    }

    pub fn is_paused(self) -> bool {
        self == ControllerState::Paused
    }

    pub fn is_cancelled(self) -> bool {
        self == ControllerState::Cancelled
    }

    pub fn is_finished(self) -> bool {
        self == ControllerState::Finished
    }

    pub fn is_failed(self) -> bool {
        self == ControllerState::Failed
    }

    pub fn is_successful(self) -> bool {
        self.is_finished()
    }
}

/// Events a controller can emit
///
/// `Changed` is the catch-all: a listener registered for `Changed`
/// receives every event the node emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerEvent {
    Started,
    Paused,
    Resumed,
    Cancelled,
    Failed,
    Finished,
    Changed,
}

impl ControllerEvent {
    /// Whether the event reports arrival in a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ControllerEvent::Cancelled | ControllerEvent::Failed | ControllerEvent::Finished
        )
    }
}
