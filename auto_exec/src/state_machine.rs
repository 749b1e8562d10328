//! # Cooperative state machine
//!
//! [`StateMachine`] sequences a multi-step routine over a routine-defined enum
//! of states. A routine never blocks: to wait for something it registers a
//! pending `(events, next_state)` relation and returns, and on a later cycle
//! [`StateMachine::check_ready_and_get_state`] reports the next state once the
//! events have resolved.
//!
//! Immediate transitions within a single cycle are made with
//! [`StateMachine::fall_through`], which the routine drives from a loop:
//!
//! ```ignore
//! if let Some(mut state) = self.sm.check_ready_and_get_state() {
//!     while let Some(next) = self.exec_state(state, robot, now)? {
//!         state = next;
//!     }
//! }
//! ```
//!
//! The number of fallthroughs per cycle is bounded so that a routine bug can't
//! spin the control loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use std::fmt::Debug;

use crate::event::{Event, EventData, EventState};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default maximum number of fallthrough transitions per cycle.
pub const DEFAULT_MAX_FALLTHROUGH: usize = 16;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A cooperative sequencer over the state type `S`.
#[derive(Debug)]
pub struct StateMachine<S> {
    name: String,
    state: Option<S>,
    enabled: bool,
    pending: Option<PendingWait<S>>,
    last_resolution: Option<WaitResolution>,
    fallthrough_count: usize,
    max_fallthrough: usize,
}

/// A registered wait: once `events` resolve the machine moves to `next`.
#[derive(Debug)]
struct PendingWait<S> {
    events: Vec<Event>,
    next: S,
    wait_for_all: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the last wait of a state machine was released.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum WaitResolution {
    /// The awaited event(s) were signaled, with the payload of the first one.
    Signaled(Option<EventData>),

    /// An awaited event was cancelled rather than signaled.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum StateMachineError {
    #[error("State machine \"{0}\" is already started, stop it before restarting")]
    AlreadyStarted(String),

    #[error("State machine \"{0}\" is not started")]
    NotStarted(String),

    #[error("State machine \"{0}\" already has a pending wait")]
    WaitPending(String),

    #[error("State machine \"{0}\" was asked to wait on an empty set of events")]
    NoEvents(String),

    #[error(
        "State machine \"{0}\" exceeded {1} fallthrough transitions in one \
        cycle"
    )]
    FallthroughLimit(String, usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S> StateMachine<S>
where
    S: Copy + Debug + PartialEq,
{
    /// Create a new stopped state machine.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: None,
            enabled: false,
            pending: None,
            last_resolution: None,
            fallthrough_count: 0,
            max_fallthrough: DEFAULT_MAX_FALLTHROUGH,
        }
    }

    /// Set the maximum number of fallthrough transitions per cycle.
    pub fn with_max_fallthrough(mut self, max_fallthrough: usize) -> Self {
        self.max_fallthrough = max_fallthrough;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the machine in the given state.
    ///
    /// Starting a machine that is already started is an error, it must be
    /// stopped first.
    pub fn start(&mut self, initial: S) -> Result<(), StateMachineError> {
        if self.enabled {
            return Err(StateMachineError::AlreadyStarted(self.name.clone()));
        }

        debug!("{}: started in {:?}", self.name, initial);

        self.state = Some(initial);
        self.enabled = true;
        self.pending = None;
        self.last_resolution = None;
        self.fallthrough_count = 0;

        Ok(())
    }

    /// Stop the machine, dropping any pending wait.
    ///
    /// Events of a dropped wait are cleared so nothing is left signaled and
    /// unconsumed. Stopping a stopped machine does nothing.
    pub fn stop(&mut self) {
        if let Some(pending) = self.pending.take() {
            for event in pending.events.iter() {
                event.clear();
            }
        }

        if self.enabled {
            debug!("{}: stopped in {:?}", self.name, self.state);
        }

        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The current state, `None` if the machine has never been started.
    pub fn get_state(&self) -> Option<S> {
        self.state
    }

    /// Set the current state unconditionally.
    pub fn set_state(&mut self, state: S) {
        if self.state != Some(state) {
            debug!("{}: {:?} -> {:?}", self.name, self.state, state);
        }
        self.state = Some(state);
    }

    /// Move to `next` immediately, within the current cycle.
    ///
    /// Fails if a wait is pending (the transition would race the wait) or if
    /// the per-cycle fallthrough limit has been reached.
    pub fn fall_through(&mut self, next: S) -> Result<S, StateMachineError> {
        if !self.enabled {
            return Err(StateMachineError::NotStarted(self.name.clone()));
        }

        if self.pending.is_some() {
            return Err(StateMachineError::WaitPending(self.name.clone()));
        }

        self.fallthrough_count += 1;
        if self.fallthrough_count > self.max_fallthrough {
            return Err(StateMachineError::FallthroughLimit(
                self.name.clone(),
                self.max_fallthrough,
            ));
        }

        self.set_state(next);
        Ok(next)
    }

    /// Wait for `event` to resolve, then move to `next`.
    pub fn wait_for_single_event(
        &mut self,
        event: &Event,
        next: S,
    ) -> Result<(), StateMachineError> {
        self.wait_for_events(std::slice::from_ref(event), next, false)
    }

    /// Wait for any (or all, if `wait_for_all`) of `events` to resolve, then
    /// move to `next`.
    pub fn wait_for_events(
        &mut self,
        events: &[Event],
        next: S,
        wait_for_all: bool,
    ) -> Result<(), StateMachineError> {
        if !self.enabled {
            return Err(StateMachineError::NotStarted(self.name.clone()));
        }

        if self.pending.is_some() {
            return Err(StateMachineError::WaitPending(self.name.clone()));
        }

        if events.is_empty() {
            return Err(StateMachineError::NoEvents(self.name.clone()));
        }

        debug!(
            "{}: {:?} waiting on {:?} for {:?}",
            self.name,
            self.state,
            events.iter().map(|e| e.name()).collect::<Vec<_>>(),
            next
        );

        self.pending = Some(PendingWait {
            events: events.to_vec(),
            next,
            wait_for_all,
        });

        Ok(())
    }

    /// True if a wait is registered and has not resolved yet.
    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    /// Get the state to execute this cycle.
    ///
    /// Returns `None` if the machine is stopped or its pending wait has not
    /// resolved. When the wait resolves the machine moves to the wait's next
    /// state, the awaited events are cleared and the resolution is recorded
    /// (see [`StateMachine::last_resolution`]).
    pub fn check_ready_and_get_state(&mut self) -> Option<S> {
        if !self.enabled {
            return None;
        }

        self.fallthrough_count = 0;

        let resolution = match self.pending {
            Some(ref pending) => match Self::resolve(pending) {
                Some(r) => Some((r, pending.next)),
                None => return None,
            },
            None => None,
        };

        if let Some((resolution, next)) = resolution {
            if let Some(pending) = self.pending.take() {
                for event in pending.events.iter() {
                    event.clear();
                }
            }

            if resolution == WaitResolution::Cancelled {
                debug!("{}: wait cancelled, continuing to {:?}", self.name, next);
            }

            self.last_resolution = Some(resolution);
            self.set_state(next);
        }

        self.state
    }

    /// How the most recent wait was resolved.
    pub fn last_resolution(&self) -> Option<WaitResolution> {
        self.last_resolution
    }

    /// Payload of the most recent wait, if it was signaled with one.
    pub fn last_event_data(&self) -> Option<EventData> {
        match self.last_resolution {
            Some(WaitResolution::Signaled(data)) => data,
            _ => None,
        }
    }

    fn resolve(pending: &PendingWait<S>) -> Option<WaitResolution> {
        let states: Vec<EventState> =
            pending.events.iter().map(|e| e.state()).collect();

        let resolved = if pending.wait_for_all {
            states.iter().all(|s| *s != EventState::Cleared)
        }
        else {
            states.iter().any(|s| *s != EventState::Cleared)
        };

        if !resolved {
            return None;
        }

        let data = pending
            .events
            .iter()
            .find(|e| e.is_signaled())
            .map(|e| e.data());

        let any_cancelled = states.iter().any(|s| *s == EventState::Cancelled);

        match data {
            // Waiting for all: a single cancellation cancels the wait
            Some(d) if !(pending.wait_for_all && any_cancelled) => {
                Some(WaitResolution::Signaled(d))
            }
            _ => Some(WaitResolution::Cancelled),
        }
    }
}
