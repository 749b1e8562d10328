//! # Simulated equipment
//!
//! Implementations of the equipment interfaces which let the routines run
//! without hardware, used by the executable and the tests.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod dashboard;
pub mod drive_base;
pub mod grabber;
pub mod params;
pub mod vision;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::{cell::Cell, rc::Rc};

// Internal
pub use dashboard::LogDashboard;
pub use drive_base::SimDriveBase;
pub use grabber::SimGrabber;
pub use params::Params;
pub use vision::SimVision;

use crate::{pid_drive::PidDrive, pose::Pose2D, robot::Robot};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a fully equipped simulated robot at `start`.
///
/// Returns the robot and a handle onto its ground truth pose.
pub fn build_robot(
    params: &Params,
    pid_drive: PidDrive,
    start: Pose2D,
    direction: f64,
) -> (Robot, Rc<Cell<Pose2D>>) {
    let drive_base = SimDriveBase::new(params, start);
    let pose = drive_base.pose_handle();

    let robot = Robot::new(
        Box::new(drive_base),
        pid_drive,
        Box::new(LogDashboard::new()),
    )
    .with_grabber(Box::new(SimGrabber::new("grabber", params.grabber_time_s)))
    .with_foundation_latch(Box::new(SimGrabber::new(
        "foundation_latch",
        params.latch_time_s,
    )))
    .with_vision(Box::new(SimVision::new(params, pose.clone(), direction)));

    (robot, pose)
}
