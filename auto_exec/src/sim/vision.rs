//! Simulated skystone detector

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Rotation2, Vector2};
use std::{cell::Cell, cmp::Ordering, rc::Rc};

// Internal
use super::Params;
use crate::{eqpt::VisionOracle, pose::Pose2D};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Detects skystones in front of the robot using the ground truth pose.
pub struct SimVision {
    robot_pose: Rc<Cell<Pose2D>>,

    /// Field positions of the skystones
    skystones: Vec<Vector2<f64>>,

    fov_half_width_in: f64,
    max_range_in: f64,

    /// Polls left which return nothing, simulating pipeline start up
    misses_left: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimVision {
    /// Create the detector. `direction` mirrors the skystone X positions for
    /// the blue alliance.
    pub fn new(params: &Params, robot_pose: Rc<Cell<Pose2D>>, direction: f64) -> Self {
        Self {
            robot_pose,
            skystones: params
                .skystone_xs
                .iter()
                .map(|x| Vector2::new(x * direction, params.stone_y))
                .collect(),
            fov_half_width_in: params.fov_half_width_in,
            max_range_in: params.max_range_in,
            misses_left: params.initial_misses,
        }
    }
}

impl VisionOracle for SimVision {
    fn get_target_pose(&mut self) -> Option<Pose2D> {
        if self.misses_left > 0 {
            self.misses_left -= 1;
            return None;
        }

        let robot = self.robot_pose.get();
        let position = Vector2::new(robot.x, robot.y);

        // Heading is clockwise from field +Y, so this takes field offsets into
        // the robot frame (X right, Y forward)
        let to_robot = Rotation2::new(robot.heading.to_radians());

        let target = self
            .skystones
            .iter()
            .map(|s| to_robot * (s - position))
            .filter(|v| {
                v.y > 0.0
                    && v.y <= self.max_range_in
                    && v.x.abs() <= self.fov_half_width_in
            })
            .min_by(|a, b| {
                a.x.abs().partial_cmp(&b.x.abs()).unwrap_or(Ordering::Equal)
            })
            .map(|v| Pose2D::new(v.x, v.y, 0.0));

        trace!("SimVision target: {:?}", target);

        target
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_detects_stone_in_view() {
        let mut params = Params::default();
        params.skystone_xs = vec![-32.0];
        params.initial_misses = 1;

        let pose = Rc::new(Cell::new(Pose2D::new(-30.0, 29.0, 0.0)));
        let mut vision = SimVision::new(&params, pose.clone(), 1.0);

        assert_eq!(vision.get_target_pose(), None);

        let target = vision.get_target_pose().unwrap();
        assert!((target.x + 2.0).abs() < 1e-9);
        assert!((target.y - 19.0).abs() < 1e-9);

        // Out of view to the side
        pose.set(Pose2D::new(-20.0, 29.0, 0.0));
        assert_eq!(vision.get_target_pose(), None);

        // Facing away
        pose.set(Pose2D::new(-32.0, 29.0, 180.0));
        assert_eq!(vision.get_target_pose(), None);
    }

    #[test]
    fn test_blue_mirror() {
        let mut params = Params::default();
        params.skystone_xs = vec![-32.0];

        let pose = Rc::new(Cell::new(Pose2D::new(32.0, 29.0, 0.0)));
        let mut vision = SimVision::new(&params, pose, -1.0);

        assert!(vision.get_target_pose().is_some());
    }
}
