//! Simulated holonomic drive base
//!
//! The drive is field oriented: the X and Y powers move the robot along the
//! field axes whatever its heading. The robot is stopped by the field walls,
//! which is how a stall is produced in simulation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use std::{cell::Cell, rc::Rc};

// Internal
use super::Params;
use crate::{eqpt::DriveBase, pose::Pose2D};
use util::maths::{abs_cap, lin_map};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct SimDriveBase {
    max_speed_ips: f64,
    max_turn_rate_dps: f64,
    min: Vector2<f64>,
    max: Vector2<f64>,

    /// Ground truth pose, shared with the simulated vision
    true_pose: Rc<Cell<Pose2D>>,

    /// Offset of the odometry from the ground truth
    odom_offset: Pose2D,

    /// Translation power in the field frame
    power: Vector2<f64>,
    turn_power: f64,

    prev_time_s: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDriveBase {
    pub fn new(params: &Params, start: Pose2D) -> Self {
        Self {
            max_speed_ips: params.max_speed_ips,
            max_turn_rate_dps: params.max_turn_rate_dps,
            min: Vector2::new(params.min_x, params.min_y),
            max: Vector2::new(params.max_x, params.max_y),
            true_pose: Rc::new(Cell::new(start)),
            odom_offset: Pose2D::default(),
            power: Vector2::zeros(),
            turn_power: 0.0,
            prev_time_s: None,
        }
    }

    /// Handle onto the ground truth pose.
    pub fn pose_handle(&self) -> Rc<Cell<Pose2D>> {
        self.true_pose.clone()
    }

    pub fn true_pose(&self) -> Pose2D {
        self.true_pose.get()
    }

    fn odom(&self) -> Pose2D {
        let t = self.true_pose.get();
        Pose2D::new(
            t.x + self.odom_offset.x,
            t.y + self.odom_offset.y,
            t.heading + self.odom_offset.heading,
        )
    }
}

impl DriveBase for SimDriveBase {
    fn get_x_position(&self) -> f64 {
        self.odom().x
    }

    fn get_y_position(&self) -> f64 {
        self.odom().y
    }

    fn get_heading(&self) -> f64 {
        self.odom().heading
    }

    fn set_field_position(&mut self, pose: Pose2D) {
        let t = self.true_pose.get();
        self.odom_offset = Pose2D::new(pose.x - t.x, pose.y - t.y, pose.heading - t.heading);
    }

    fn holonomic_drive(&mut self, x: f64, y: f64, turn: f64) {
        self.power = Vector2::new(abs_cap(x, 1.0), abs_cap(y, 1.0));
        self.turn_power = abs_cap(turn, 1.0);
    }

    fn periodic(&mut self, now_s: f64) {
        let dt = match self.prev_time_s {
            Some(t0) if now_s > t0 => now_s - t0,
            _ => 0.0,
        };
        self.prev_time_s = Some(now_s);

        let mut pose = self.true_pose.get();

        let velocity = self.power.map(|p| {
            lin_map((-1.0, 1.0), (-self.max_speed_ips, self.max_speed_ips), p)
        });
        let position = Vector2::new(pose.x, pose.y) + velocity * dt;
        let clamped = position.sup(&self.min).inf(&self.max);

        pose.x = clamped.x;
        pose.y = clamped.y;
        pose.heading += lin_map(
            (-1.0, 1.0),
            (-self.max_turn_rate_dps, self.max_turn_rate_dps),
            self.turn_power,
        ) * dt;

        if clamped != position {
            trace!("SimDriveBase against the wall at {}", pose);
        }

        self.true_pose.set(pose);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_drive_and_walls() {
        let params = Params::default();
        let mut db = SimDriveBase::new(&params, Pose2D::new(0.0, 20.0, 0.0));

        db.periodic(0.0);
        db.holonomic_drive(0.5, -1.0, 0.0);
        db.periodic(0.1);

        assert!((db.get_x_position() - 2.0).abs() < 1e-9);
        assert!((db.get_y_position() - 16.0).abs() < 1e-9);

        // Driving into the alliance wall stops at the wall
        db.periodic(2.0);
        assert_eq!(db.get_y_position(), params.min_y);
    }

    #[test]
    fn test_rebase_odometry() {
        let params = Params::default();
        let mut db = SimDriveBase::new(&params, Pose2D::new(10.0, 20.0, 0.0));

        db.set_field_position(Pose2D::new(0.0, 0.0, 90.0));
        assert_eq!(db.get_field_position(), Pose2D::new(0.0, 0.0, 90.0));
        assert_eq!(db.true_pose(), Pose2D::new(10.0, 20.0, 0.0));

        db.periodic(0.0);
        db.holonomic_drive(0.0, 0.0, 1.0);
        db.periodic(0.5);
        assert!((db.get_heading() - 180.0).abs() < 1e-9);
    }
}
