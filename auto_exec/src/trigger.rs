//! # Edge triggers
//!
//! A [`Trigger`] polls a boolean predicate each cycle and runs its action once
//! on every false to true transition. Triggers are how a sensor or vision
//! condition interrupts a move before the PID axes would finish on their own.
//!
//! The predicate and action receive the context explicitly (usually the
//! [`Robot`](crate::robot::Robot)) instead of capturing it, so ownership of
//! the hardware stays with the caller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use std::fmt;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Predicate polled by a trigger.
pub type TriggerPredicate<C> = Box<dyn FnMut(&mut C) -> bool>;

/// Action run when a trigger fires.
pub type TriggerAction<C> = Box<dyn FnMut(&mut C)>;

/// Rising edge detector over a predicate.
pub struct Trigger<C> {
    name: String,
    predicate: TriggerPredicate<C>,
    action: Option<TriggerAction<C>>,
    enabled: bool,
    last_value: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C> Trigger<C> {
    /// Create a new disabled trigger.
    pub fn new(
        name: &str,
        predicate: TriggerPredicate<C>,
        action: Option<TriggerAction<C>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            predicate,
            action,
            enabled: false,
            last_value: false,
        }
    }

    /// Enable or disable the trigger.
    ///
    /// Enabling resets the last seen value, so a predicate which is already
    /// true fires on the first update after enabling.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.last_value = false;
        }

        if enabled != self.enabled {
            debug!(
                "Trigger \"{}\" {}",
                self.name,
                if enabled { "enabled" } else { "disabled" }
            );
        }

        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Evaluate the predicate, running the action on a rising edge.
    ///
    /// Returns true if the trigger fired this cycle. A disabled trigger does
    /// not evaluate its predicate.
    pub fn update(&mut self, ctx: &mut C) -> bool {
        if !self.enabled {
            return false;
        }

        let value = (self.predicate)(ctx);
        let fired = value && !self.last_value;
        self.last_value = value;

        if fired {
            debug!("Trigger \"{}\" fired", self.name);

            if let Some(ref mut action) = self.action {
                action(ctx);
            }
        }

        fired
    }
}

impl<C> fmt::Debug for Trigger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("last_value", &self.last_value)
            .finish()
    }
}
