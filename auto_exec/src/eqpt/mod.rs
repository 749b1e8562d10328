//! # Equipment interfaces
//!
//! The hardware and perception collaborators of the control core, specified
//! only at their interface. Real drivers and the simulated equipment in
//! [`crate::sim`] implement these traits.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::fmt;

// Internal
use crate::{
    event::Event,
    pose::{Axis, Pose2D},
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A holonomic drive base with odometry.
///
/// Positions are field positions in inches, heading is in degrees and is
/// continuous.
pub trait DriveBase {
    fn get_x_position(&self) -> f64;

    fn get_y_position(&self) -> f64;

    fn get_heading(&self) -> f64;

    fn get_field_position(&self) -> Pose2D {
        Pose2D::new(
            self.get_x_position(),
            self.get_y_position(),
            self.get_heading(),
        )
    }

    /// Rebase the odometry so the current position reads as `pose`.
    fn set_field_position(&mut self, pose: Pose2D);

    /// Command the drive with X, Y and turn powers in `[-1, 1]`.
    fn holonomic_drive(&mut self, x: f64, y: f64, turn: f64);

    fn stop(&mut self) {
        self.holonomic_drive(0.0, 0.0, 0.0);
    }

    /// Called once per cycle before the PidDrive reads the odometry.
    fn periodic(&mut self, _now_s: f64) {}

    /// Get the measurement for the given axis.
    fn get_position(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.get_x_position(),
            Axis::Y => self.get_y_position(),
            Axis::Turn => self.get_heading(),
        }
    }
}

/// A two-position actuator, such as a stone grabber or foundation latch.
///
/// Movements are asynchronous: the optional event is signaled once the
/// actuator has had time to complete the move.
pub trait Grabber {
    /// Close the grabber, taking the default move time.
    fn grab(&mut self, event: Option<&Event>, now_s: f64);

    /// Close the grabber, signaling `event` after `time_s`.
    fn grab_for(&mut self, time_s: f64, event: Option<&Event>, now_s: f64);

    /// Open the grabber, taking the default move time.
    fn release(&mut self, event: Option<&Event>, now_s: f64);

    /// Open the grabber, signaling `event` after `time_s`.
    fn release_for(&mut self, time_s: f64, event: Option<&Event>, now_s: f64);

    fn is_grabbed(&self) -> bool;

    /// Advance any in-progress move.
    fn update(&mut self, now_s: f64);

    /// Abandon any in-progress move without signaling its event.
    fn cancel(&mut self);
}

/// A vision pipeline which can be polled for a target.
pub trait VisionOracle {
    /// Pose of the detected target relative to the robot, or `None` if nothing
    /// is detected. Never blocks.
    ///
    /// `x` is lateral (positive to the right), `y` is forward, both in inches.
    fn get_target_pose(&mut self) -> Option<Pose2D>;
}

/// A fire-and-forget telemetry sink.
pub trait Dashboard {
    fn display_printf(&mut self, line: usize, args: fmt::Arguments);
}
