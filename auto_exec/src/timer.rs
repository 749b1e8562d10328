//! # Single-shot timer
//!
//! A [`Timer`] arms a deadline bound to an [`Event`] and signals that event
//! once the deadline has passed. Time is supplied by the caller every cycle
//! (session elapsed seconds), there are no OS-level alarms.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use crate::event::{Event, EventData};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single-shot countdown.
#[derive(Debug)]
pub struct Timer {
    name: String,
    arm: Option<TimerArm>,
}

#[derive(Debug)]
struct TimerArm {
    deadline_s: f64,
    event: Event,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Timer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arm: None,
        }
    }

    /// Arm the timer to signal `event` `duration_s` seconds after `now_s`.
    ///
    /// Re-arming replaces any previous arm, the previous event is left as it
    /// was.
    pub fn set(&mut self, duration_s: f64, event: &Event, now_s: f64) {
        debug!("Timer \"{}\" armed for {:.3} s", self.name, duration_s);

        event.clear();
        self.arm = Some(TimerArm {
            deadline_s: now_s + duration_s.max(0.0),
            event: event.clone(),
        });
    }

    /// Check the deadline, returning true on the cycle the timer expires.
    ///
    /// The event is signaled exactly once per arm, with the expiry time as its
    /// payload.
    pub fn update(&mut self, now_s: f64) -> bool {
        let expired = match self.arm {
            Some(ref arm) => now_s >= arm.deadline_s,
            None => false,
        };

        if expired {
            if let Some(arm) = self.arm.take() {
                debug!("Timer \"{}\" expired", self.name);
                arm.event.set(Some(EventData::Value(now_s)));
            }
        }

        expired
    }

    /// Disarm the timer without signaling its event.
    ///
    /// The event is marked cancelled so that a state machine waiting on it is
    /// released. Cancelling a disarmed timer does nothing.
    pub fn cancel(&mut self) {
        if let Some(arm) = self.arm.take() {
            debug!("Timer \"{}\" cancelled", self.name);
            arm.event.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.arm.is_some()
    }

    /// Seconds until the deadline, if armed.
    pub fn remaining_s(&self, now_s: f64) -> Option<f64> {
        self.arm
            .as_ref()
            .map(|arm| (arm.deadline_s - now_s).max(0.0))
    }
}
