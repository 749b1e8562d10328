//! # Absolute target drive
//!
//! [`AbsTargetDrive`] turns a sequence of relative moves into cumulative
//! absolute targets. Each call adds its deltas to a running absolute target
//! and commands the PidDrive towards that total, so the shortfall left by one
//! move (anything inside the PidDrive tolerance, or a move that was cut short)
//! is made up by the next one rather than compounded.
//!
//! After N calls with deltas `d_1..d_N` on an axis the absolute target is
//! exactly `x_0 + sum(d_i)` whatever the drive base actually achieved.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use std::fmt::Debug;

// Internal
use crate::{
    event::Event,
    pid_drive::PidDriveError,
    pose::{Axes, Axis, Pose2D},
    robot::Robot,
    state_machine::{StateMachine, StateMachineError},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct AbsTargetDrive {
    name: String,

    /// Event shared by every move of this drive
    event: Event,

    /// Running absolute target
    abs_target: Pose2D,

    /// Per axis flag, true if that axis controller takes absolute setpoints
    abs_controller: Axes<bool>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AbsTargetDriveError {
    #[error(
        "The PidDrive has absolute target mode enabled on the {0} axis, which \
        would accumulate the targets twice"
    )]
    TargetModeConflict(Axis),

    #[error("Absolute target {0} is not finite")]
    InvalidTarget(Pose2D),

    #[error("State machine error: {0}")]
    StateMachineError(#[from] StateMachineError),

    #[error("PidDrive error: {0}")]
    PidDriveError(#[from] PidDriveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AbsTargetDrive {
    /// Create a new drive, seeding the absolute target from the drive base
    /// pose.
    pub fn new(
        name: &str,
        robot: &Robot,
        event: &Event,
    ) -> Result<Self, AbsTargetDriveError> {
        let mode = robot.pid_drive.get_abs_target_mode();
        for &axis in Axis::ALL.iter() {
            if *mode.get(axis) {
                return Err(AbsTargetDriveError::TargetModeConflict(axis));
            }
        }

        let abs_controller = Axes::new(
            robot.pid_drive.controller(Axis::X).is_absolute_setpoint(),
            robot.pid_drive.controller(Axis::Y).is_absolute_setpoint(),
            robot.pid_drive.controller(Axis::Turn).is_absolute_setpoint(),
        );

        let abs_target = robot.drive_base.get_field_position();
        debug!("{}: absolute target seeded at {}", name, abs_target);

        Ok(Self {
            name: name.to_string(),
            event: event.clone(),
            abs_target,
            abs_controller,
        })
    }

    /// Move by the given deltas from the previous absolute target, then move
    /// `sm` to `next` once the move finishes.
    #[allow(clippy::too_many_arguments)]
    pub fn set_target<S>(
        &mut self,
        robot: &mut Robot,
        sm: &mut StateMachine<S>,
        dx: f64,
        dy: f64,
        dturn: f64,
        next: S,
        now_s: f64,
    ) -> Result<(), AbsTargetDriveError>
    where
        S: Copy + Debug + PartialEq,
    {
        let target = Pose2D::new(
            self.abs_target.x + dx,
            self.abs_target.y + dy,
            self.abs_target.heading + dturn,
        );

        if !target.is_finite() {
            return Err(AbsTargetDriveError::InvalidTarget(target));
        }

        // Fail before the drive moves if the wait can't be registered
        if !sm.is_enabled() {
            return Err(StateMachineError::NotStarted(sm.name().to_string()).into());
        }
        if sm.is_waiting() {
            return Err(StateMachineError::WaitPending(sm.name().to_string()).into());
        }

        let measured = robot.drive_base.get_field_position();
        let targets = Axes::from(target).map(|axis, total| {
            if *self.abs_controller.get(axis) {
                *total
            }
            else {
                *total - measured.get(axis)
            }
        });

        debug!(
            "{}: delta ({:.1}, {:.1}, {:.1}), absolute target {}, commanded {:?}",
            self.name, dx, dy, dturn, target, targets
        );

        robot.pid_drive.set_target(
            robot.drive_base.as_ref(),
            targets,
            false,
            Some(&self.event),
            now_s,
        )?;
        self.abs_target = target;

        sm.wait_for_single_event(&self.event, next)?;

        Ok(())
    }

    pub fn set_x_target<S>(
        &mut self,
        robot: &mut Robot,
        sm: &mut StateMachine<S>,
        dx: f64,
        next: S,
        now_s: f64,
    ) -> Result<(), AbsTargetDriveError>
    where
        S: Copy + Debug + PartialEq,
    {
        self.set_target(robot, sm, dx, 0.0, 0.0, next, now_s)
    }

    pub fn set_y_target<S>(
        &mut self,
        robot: &mut Robot,
        sm: &mut StateMachine<S>,
        dy: f64,
        next: S,
        now_s: f64,
    ) -> Result<(), AbsTargetDriveError>
    where
        S: Copy + Debug + PartialEq,
    {
        self.set_target(robot, sm, 0.0, dy, 0.0, next, now_s)
    }

    pub fn set_turn_target<S>(
        &mut self,
        robot: &mut Robot,
        sm: &mut StateMachine<S>,
        dturn: f64,
        next: S,
        now_s: f64,
    ) -> Result<(), AbsTargetDriveError>
    where
        S: Copy + Debug + PartialEq,
    {
        self.set_target(robot, sm, 0.0, 0.0, dturn, next, now_s)
    }

    pub fn set_xy_target<S>(
        &mut self,
        robot: &mut Robot,
        sm: &mut StateMachine<S>,
        dx: f64,
        dy: f64,
        next: S,
        now_s: f64,
    ) -> Result<(), AbsTargetDriveError>
    where
        S: Copy + Debug + PartialEq,
    {
        self.set_target(robot, sm, dx, dy, 0.0, next, now_s)
    }

    /// Replace the running absolute target, for example after the odometry
    /// has been rebased.
    pub fn set_absolute_target(
        &mut self,
        pose: Pose2D,
    ) -> Result<(), AbsTargetDriveError> {
        if !pose.is_finite() {
            return Err(AbsTargetDriveError::InvalidTarget(pose));
        }

        debug!("{}: absolute target reset to {}", self.name, pose);
        self.abs_target = pose;
        Ok(())
    }

    pub fn get_absolute_target(&self) -> Pose2D {
        self.abs_target
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Cancel the current move.
    pub fn cancel(&mut self, robot: &mut Robot) {
        robot.cancel_drive();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        pid_drive::{state::test::*, PidDrive},
        sim::LogDashboard,
    };

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum State {
        First,
        Second,
        Done,
    }

    fn make_robot(params: &crate::pid_drive::Params) -> Robot {
        Robot::new(
            Box::new(TestBase::new()),
            PidDrive::new(params),
            Box::new(LogDashboard::new()),
        )
    }

    #[test]
    fn test_compensates_shortfall() {
        let mut robot = make_robot(&test_params());
        let event = Event::new("abs");
        let mut sm = StateMachine::new("abs");
        let mut drive = AbsTargetDrive::new("abs", &robot, &event).unwrap();

        sm.start(State::First).unwrap();
        drive
            .set_y_target(&mut robot, &mut sm, 24.0, State::Second, 0.0)
            .unwrap();
        assert_eq!(robot.pid_drive.last_command().y, 24.0);

        // The drive base only got to 22 before the move finished
        robot
            .drive_base
            .set_field_position(Pose2D::new(0.0, 22.0, 0.0));
        event.set(None);
        assert_eq!(sm.check_ready_and_get_state(), Some(State::Second));

        drive
            .set_y_target(&mut robot, &mut sm, 12.0, State::Done, 1.0)
            .unwrap();
        assert_eq!(robot.pid_drive.last_command().y, 14.0);
        assert_eq!(drive.get_absolute_target().y, 36.0);
        assert_eq!(robot.pid_drive.controller(Axis::Y).get_setpoint(), 36.0);
    }

    #[test]
    fn test_cumulative_target_is_exact_sum() {
        let mut params = test_params();
        params.x.absolute_setpoint = true;
        let mut robot = make_robot(&params);
        robot
            .drive_base
            .set_field_position(Pose2D::new(3.0, 0.0, 0.0));

        let event = Event::new("abs");
        let mut sm = StateMachine::new("abs");
        let mut drive = AbsTargetDrive::new("abs", &robot, &event).unwrap();
        sm.start(State::First).unwrap();

        let deltas = [10.0, -4.0, 7.5, 0.25, -20.0];
        let actual = [11.0, 8.0, 16.0, 15.0, -2.0];
        let mut sum = 3.0;

        for (d, a) in deltas.iter().zip(actual.iter()) {
            drive
                .set_x_target(&mut robot, &mut sm, *d, State::First, 0.0)
                .unwrap();
            sum += d;

            // Absolute controller: the total is commanded directly
            assert_eq!(drive.get_absolute_target().x, sum);
            assert_eq!(robot.pid_drive.last_command().x, sum);

            robot
                .drive_base
                .set_field_position(Pose2D::new(*a, 0.0, 0.0));
            event.set(None);
            sm.check_ready_and_get_state();
        }
    }

    #[test]
    fn test_rejects_abs_target_mode() {
        let mut params = test_params();
        params.abs_target_mode.turn = true;
        let robot = make_robot(&params);

        assert!(matches!(
            AbsTargetDrive::new("abs", &robot, &Event::new("abs")),
            Err(AbsTargetDriveError::TargetModeConflict(Axis::Turn))
        ));
    }

    #[test]
    fn test_pending_wait_does_not_move() {
        let mut robot = make_robot(&test_params());
        let event = Event::new("abs");
        let mut sm = StateMachine::new("abs");
        let mut drive = AbsTargetDrive::new("abs", &robot, &event).unwrap();

        // Not started
        assert!(drive
            .set_x_target(&mut robot, &mut sm, 5.0, State::Done, 0.0)
            .is_err());
        assert!(!robot.pid_drive.is_active());
        assert_eq!(drive.get_absolute_target().x, 0.0);

        sm.start(State::First).unwrap();
        drive
            .set_xy_target(&mut robot, &mut sm, 5.0, 5.0, State::Second, 0.0)
            .unwrap();
        assert!(matches!(
            drive.set_x_target(&mut robot, &mut sm, 5.0, State::Done, 0.0),
            Err(AbsTargetDriveError::StateMachineError(
                StateMachineError::WaitPending(_)
            ))
        ));
        assert_eq!(drive.get_absolute_target(), Pose2D::new(5.0, 5.0, 0.0));

        drive.set_absolute_target(Pose2D::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(drive.get_absolute_target(), Pose2D::new(1.0, 2.0, 3.0));
    }
}
