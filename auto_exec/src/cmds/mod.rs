//! # Autonomous routines
//!
//! Routines built on the command engine. Each routine is a [`RobotCommand`]
//! owning its own state machine, event and timer, and is stepped once per
//! control cycle by [`crate::robot_cmd::run_cycle`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod building_zone;
pub mod field;
pub mod loading_zone;
pub mod params;
pub mod skystone_vision;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;
use std::str::FromStr;

// Internal
pub use building_zone::CmdAutoBuildingZone;
pub use loading_zone::CmdAutoLoadingZone;
pub use params::{Alliance, AutoChoices, ParkPosition};
pub use skystone_vision::{CmdSkystoneVision, VisionParams};

use crate::{
    pose::Pose2D,
    robot::Robot,
    robot_cmd::{CmdError, RobotCommand},
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The routines which can be run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Routine {
    BuildingZone,
    LoadingZone,
    SkystoneVision,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown routine \"{0}\", expected building_zone, loading_zone or skystone_vision")]
pub struct ParseRoutineError(String);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Routine {
    /// Field pose the routine starts from.
    pub fn start_pose(&self, choices: &AutoChoices) -> Pose2D {
        let direction = choices.alliance.direction();

        match self {
            Routine::BuildingZone => Pose2D::new(
                field::BUILDING_ZONE_START_X * direction,
                field::ROBOT_START_Y,
                0.0,
            ),
            Routine::LoadingZone => CmdAutoLoadingZone::start_pose(choices),
            Routine::SkystoneVision => Pose2D::new(
                field::FAR_STONE1_X * direction,
                field::ROBOT_START_Y + field::SKYSTONE_LINE_DISTANCE,
                0.0,
            ),
        }
    }

    /// Build and start the routine for `robot`.
    pub fn build(
        &self,
        robot: &Robot,
        choices: &AutoChoices,
    ) -> Result<Box<dyn RobotCommand>, CmdError> {
        Ok(match self {
            Routine::BuildingZone => Box::new(CmdAutoBuildingZone::new(robot, choices)?),
            Routine::LoadingZone => Box::new(CmdAutoLoadingZone::new(robot, choices)?),
            Routine::SkystoneVision => {
                let mut cmd =
                    CmdSkystoneVision::new(choices, VisionParams::from_choices(choices));
                cmd.start()?;
                Box::new(cmd)
            }
        })
    }
}

impl FromStr for Routine {
    type Err = ParseRoutineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "building_zone" | "building" => Ok(Routine::BuildingZone),
            "loading_zone" | "loading" => Ok(Routine::LoadingZone),
            "skystone_vision" | "vision" => Ok(Routine::SkystoneVision),
            _ => Err(ParseRoutineError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_routine() {
        assert_eq!("building_zone".parse::<Routine>().unwrap(), Routine::BuildingZone);
        assert_eq!("Loading".parse::<Routine>().unwrap(), Routine::LoadingZone);
        assert_eq!("vision".parse::<Routine>().unwrap(), Routine::SkystoneVision);
        assert!("teleop".parse::<Routine>().is_err());
    }

    #[test]
    fn test_start_poses_mirror() {
        let mut choices = AutoChoices::default();

        choices.alliance = Alliance::Red;
        let red = Routine::LoadingZone.start_pose(&choices);
        choices.alliance = Alliance::Blue;
        let blue = Routine::LoadingZone.start_pose(&choices);

        assert_eq!(red.x, -blue.x);
        assert_eq!(red.y, blue.y);
    }
}
