//! Decoupled event bus between the workflow and whatever renders it.
//!
//! The workflow emits via [`EventBus::emit`]; front-ends subscribe via
//! [`EventBus::subscribe`]. Built on [`tokio::sync::broadcast`] so a toast
//! printer, a spinner and a test recorder can all listen independently.

use tokio::sync::broadcast;

use crate::workflow::UploadState;

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

/// A transient, user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

/// Events that flow out of the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The upload state moved from one stage to another.
    StateChanged { from: UploadState, to: UploadState },
    /// The drop target highlight was toggled.
    Highlight { active: bool },
    /// Show a toast.
    Toast(Toast),
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
