//! Simulated two-position servo actuator
//!
//! A servo has no position feedback, so a move is considered complete once
//! the move time has elapsed. The completion is signaled through a [`Timer`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use crate::{eqpt::Grabber, event::Event, timer::Timer};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct SimGrabber {
    name: String,
    move_time_s: f64,
    grabbed: bool,
    timer: Timer,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimGrabber {
    pub fn new(name: &str, move_time_s: f64) -> Self {
        Self {
            name: name.to_string(),
            move_time_s,
            grabbed: false,
            timer: Timer::new(name),
        }
    }

    fn set_position(
        &mut self,
        grabbed: bool,
        time_s: f64,
        event: Option<&Event>,
        now_s: f64,
    ) {
        debug!(
            "{} {}",
            self.name,
            if grabbed { "grabbing" } else { "releasing" }
        );

        self.grabbed = grabbed;

        match event {
            Some(e) => self.timer.set(time_s, e, now_s),
            None => self.timer.cancel(),
        }
    }
}

impl Grabber for SimGrabber {
    fn grab(&mut self, event: Option<&Event>, now_s: f64) {
        self.set_position(true, self.move_time_s, event, now_s);
    }

    fn grab_for(&mut self, time_s: f64, event: Option<&Event>, now_s: f64) {
        self.set_position(true, time_s, event, now_s);
    }

    fn release(&mut self, event: Option<&Event>, now_s: f64) {
        self.set_position(false, self.move_time_s, event, now_s);
    }

    fn release_for(&mut self, time_s: f64, event: Option<&Event>, now_s: f64) {
        self.set_position(false, time_s, event, now_s);
    }

    fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    fn update(&mut self, now_s: f64) {
        self.timer.update(now_s);
    }

    fn cancel(&mut self) {
        self.timer.cancel();
    }
}
