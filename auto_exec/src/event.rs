//! # Completion events
//!
//! An [`Event`] is the completion primitive of the engine. Whoever completes an
//! operation (the PidDrive reaching its target, a timer expiring, an actuator
//! finishing its move) sets the event, and the routine that started the
//! operation observes it through its state machine.
//!
//! Events are cheap cloneable handles onto shared state, so the routine, the
//! state machine and the operation can all refer to the same event. Everything
//! runs on the single control loop thread, so the shared state is an
//! `Rc<RefCell<_>>` rather than anything thread-safe.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;
use std::{cell::RefCell, fmt, rc::Rc};

use crate::pose::{Axis, Pose2D};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A one-shot, settable and clearable completion signal.
#[derive(Clone)]
pub struct Event {
    inner: Rc<RefCell<EventInner>>,
}

struct EventInner {
    name: String,
    state: EventState,
    data: Option<EventData>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The state of an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum EventState {
    /// Not yet signaled, or consumed and reset.
    Cleared,

    /// The operation bound to the event completed.
    Signaled,

    /// The operation bound to the event was cancelled before completing.
    Cancelled,
}

/// Data attached to a signaled event.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum EventData {
    /// The outcome of a drive move.
    Drive(DriveOutcome),

    /// A pose, for example a vision detection.
    Pose(Pose2D),

    /// A plain scalar.
    Value(f64),
}

/// How a PidDrive move finished.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum DriveOutcome {
    /// Every axis settled inside its tolerance.
    OnTarget,

    /// The given axis stalled before reaching its target.
    Stalled { axis: Axis },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Event {
    /// Create a new cleared event.
    pub fn new(name: &str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EventInner {
                name: name.to_string(),
                state: EventState::Cleared,
                data: None,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Signal the event with an optional payload.
    ///
    /// Signaling is idempotent: an event that is already signaled keeps the
    /// payload it was first signaled with until it is cleared.
    pub fn set(&self, data: Option<EventData>) {
        let mut inner = self.inner.borrow_mut();

        if inner.state == EventState::Signaled {
            return;
        }

        trace!("Event \"{}\" signaled with {:?}", inner.name, data);
        inner.state = EventState::Signaled;
        inner.data = data;
    }

    /// Mark the event as cancelled.
    ///
    /// A cancelled event is not signaled, but it does release anything waiting
    /// on it. Cancelling a signaled event has no effect, the completion has
    /// already happened.
    pub fn cancel(&self) {
        let mut inner = self.inner.borrow_mut();

        if inner.state != EventState::Cleared {
            return;
        }

        trace!("Event \"{}\" cancelled", inner.name);
        inner.state = EventState::Cancelled;
        inner.data = None;
    }

    /// Reset the event to the cleared state, dropping any payload.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.state = EventState::Cleared;
        inner.data = None;
    }

    pub fn state(&self) -> EventState {
        self.inner.borrow().state
    }

    pub fn is_signaled(&self) -> bool {
        self.state() == EventState::Signaled
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == EventState::Cancelled
    }

    /// True if the event is either signaled or cancelled.
    pub fn is_resolved(&self) -> bool {
        self.state() != EventState::Cleared
    }

    /// The payload of a signaled event.
    pub fn data(&self) -> Option<EventData> {
        self.inner.borrow().data
    }

    /// True if both handles refer to the same event.
    pub fn same_as(&self, other: &Event) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Event")
            .field("name", &inner.name)
            .field("state", &inner.state)
            .field("data", &inner.data)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_event_single_fire() {
        let event = Event::new("test");
        assert!(!event.is_signaled());

        event.set(Some(EventData::Value(1.0)));
        assert!(event.is_signaled());

        // A second set does not overwrite the payload
        event.set(Some(EventData::Value(2.0)));
        assert_eq!(event.data(), Some(EventData::Value(1.0)));

        event.clear();
        assert!(!event.is_signaled());
        assert_eq!(event.data(), None);
    }

    #[test]
    fn test_event_cancel() {
        let event = Event::new("test");
        event.cancel();
        assert!(event.is_cancelled());
        assert!(!event.is_signaled());
        assert!(event.is_resolved());

        // Cancelling after completion keeps the completion
        let event = Event::new("done");
        event.set(Some(EventData::Drive(DriveOutcome::OnTarget)));
        event.cancel();
        assert!(event.is_signaled());
        assert_eq!(
            event.data(),
            Some(EventData::Drive(DriveOutcome::OnTarget))
        );
    }

    #[test]
    fn test_event_shared_handle() {
        let event = Event::new("shared");
        let other = event.clone();

        other.set(None);
        assert!(event.is_signaled());
        assert!(event.same_as(&other));
        assert!(!event.same_as(&Event::new("shared")));
    }
}
