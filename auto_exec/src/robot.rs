//! # Robot
//!
//! The hardware context passed explicitly to the active command each cycle.
//! Only the active command writes to the robot during a cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use crate::{
    eqpt::{Dashboard, DriveBase, Grabber, VisionOracle},
    event::DriveOutcome,
    pid_drive::PidDrive,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Robot {
    pub drive_base: Box<dyn DriveBase>,

    pub pid_drive: PidDrive,

    /// Stone grabber
    pub grabber: Option<Box<dyn Grabber>>,

    /// Foundation hooks
    pub foundation_latch: Option<Box<dyn Grabber>>,

    pub vision: Option<Box<dyn VisionOracle>>,

    pub dashboard: Box<dyn Dashboard>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Robot {
    pub fn new(
        drive_base: Box<dyn DriveBase>,
        pid_drive: PidDrive,
        dashboard: Box<dyn Dashboard>,
    ) -> Self {
        Self {
            drive_base,
            pid_drive,
            grabber: None,
            foundation_latch: None,
            vision: None,
            dashboard,
        }
    }

    pub fn with_grabber(mut self, grabber: Box<dyn Grabber>) -> Self {
        self.grabber = Some(grabber);
        self
    }

    pub fn with_foundation_latch(mut self, latch: Box<dyn Grabber>) -> Self {
        self.foundation_latch = Some(latch);
        self
    }

    pub fn with_vision(mut self, vision: Box<dyn VisionOracle>) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Run the robot side of a control cycle.
    ///
    /// The drive base is updated first, then the actuators, then the PidDrive,
    /// whose outcome is returned if its move finished this cycle.
    pub fn periodic(&mut self, now_s: f64) -> Option<DriveOutcome> {
        self.drive_base.periodic(now_s);

        if let Some(ref mut grabber) = self.grabber {
            grabber.update(now_s);
        }

        if let Some(ref mut latch) = self.foundation_latch {
            latch.update(now_s);
        }

        self.pid_drive.update(self.drive_base.as_mut(), now_s)
    }

    /// Cancel the current drive move.
    pub fn cancel_drive(&mut self) {
        self.pid_drive.cancel(self.drive_base.as_mut());
    }

    /// Abandon any in-progress grabber or latch move, so its completion event
    /// is never signaled.
    pub fn cancel_actuator_moves(&mut self) {
        if let Some(ref mut grabber) = self.grabber {
            grabber.cancel();
        }

        if let Some(ref mut latch) = self.foundation_latch {
            latch.cancel();
        }
    }

    /// Stop every actuator and the drive.
    pub fn stop(&mut self) {
        self.cancel_drive();
        self.cancel_actuator_moves();
        self.drive_base.stop();
    }
}
