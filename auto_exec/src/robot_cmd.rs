//! # Robot commands
//!
//! A [`RobotCommand`] is a multi-step routine stepped once per control cycle.
//! [`run_cycle`] is the single entry point the control loop uses, it steps the
//! active command and then the robot, so anything the command does in a cycle
//! (a trigger cancelling the drive, a new target) is seen by the PidDrive in
//! that same cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::error;

// Internal
use crate::{
    abs_target_drive::AbsTargetDriveError, pid_drive::PidDriveError, robot::Robot,
    state_machine::StateMachineError,
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A multi-step routine built on the engine.
pub trait RobotCommand {
    fn name(&self) -> &str;

    /// True while the command is running.
    fn is_active(&self) -> bool;

    /// Cancel the command.
    ///
    /// Cancelling must cancel any drive move the command started, disable its
    /// triggers, disarm its timers and stop its state machine. Cancelling an
    /// inactive command does nothing.
    fn cancel(&mut self, robot: &mut Robot);

    /// Step the command, returning true once it has finished.
    ///
    /// `elapsed_s` is the session time, used for the command's timers.
    fn periodic_step(
        &mut self,
        robot: &mut Robot,
        elapsed_s: f64,
    ) -> Result<bool, CmdError>;

    /// Name of the state the command is currently in.
    fn state_name(&self) -> Option<String>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CmdError {
    #[error("State machine error: {0}")]
    StateMachineError(#[from] StateMachineError),

    #[error("PidDrive error: {0}")]
    PidDriveError(#[from] PidDriveError),

    #[error("AbsTargetDrive error: {0}")]
    AbsTargetDriveError(#[from] AbsTargetDriveError),

    #[error("The robot has no {0}")]
    MissingEquipment(&'static str),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Run one control cycle of `cmd`.
///
/// The command is stepped first, then the robot (drive base, actuators and
/// PidDrive). A command that returns an error is aborted: the error is logged
/// and the command cancelled, so the control loop keeps running.
///
/// Returns true if the command has finished or was aborted.
pub fn run_cycle(cmd: &mut dyn RobotCommand, robot: &mut Robot, now_s: f64) -> bool {
    let done = match cmd.periodic_step(robot, now_s) {
        Ok(done) => done,
        Err(e) => {
            error!("{} aborted in {:?}: {}", cmd.name(), cmd.state_name(), e);
            cmd.cancel(robot);
            true
        }
    };

    robot.periodic(now_s);

    done
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        eqpt::DriveBase,
        event::{DriveOutcome, Event, EventData},
        pid_ctrl::{PidCoefficients, PidParams},
        pid_drive::{self, PidDrive},
        pose::{Axes, Pose2D},
        sim::LogDashboard,
        state_machine::{StateMachine, WaitResolution},
        trigger::Trigger,
    };
    use std::{cell::Cell, rc::Rc};

    /// A drive base which only moves when placed.
    struct PlacedBase(Pose2D);

    impl DriveBase for PlacedBase {
        fn get_x_position(&self) -> f64 {
            self.0.x
        }

        fn get_y_position(&self) -> f64 {
            self.0.y
        }

        fn get_heading(&self) -> f64 {
            self.0.heading
        }

        fn set_field_position(&mut self, pose: Pose2D) {
            self.0 = pose;
        }

        fn holonomic_drive(&mut self, _x: f64, _y: f64, _turn: f64) {}
    }

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum State {
        Move,
        Arrived,
    }

    /// Drives forward until the bumper trigger cancels the move.
    struct BumpCmd {
        event: Event,
        sm: StateMachine<State>,
        bumper: Trigger<Robot>,
        resolution: Option<WaitResolution>,
    }

    impl BumpCmd {
        fn new(bumped: Rc<Cell<bool>>) -> Self {
            let mut sm = StateMachine::new("BumpCmd");
            sm.start(State::Move).unwrap();

            let mut bumper = Trigger::new(
                "bumper",
                Box::new(move |_: &mut Robot| bumped.get()),
                Some(Box::new(|robot: &mut Robot| robot.cancel_drive())),
            );
            bumper.set_enabled(true);

            Self {
                event: Event::new("bump"),
                sm,
                bumper,
                resolution: None,
            }
        }
    }

    impl RobotCommand for BumpCmd {
        fn name(&self) -> &str {
            self.sm.name()
        }

        fn is_active(&self) -> bool {
            self.sm.is_enabled()
        }

        fn cancel(&mut self, robot: &mut Robot) {
            robot.cancel_drive();
            self.sm.stop();
        }

        fn periodic_step(
            &mut self,
            robot: &mut Robot,
            elapsed_s: f64,
        ) -> Result<bool, CmdError> {
            self.bumper.update(robot);

            match self.sm.check_ready_and_get_state() {
                Some(State::Move) => {
                    robot.pid_drive.set_relative_y_target(
                        robot.drive_base.as_ref(),
                        10.0,
                        Some(&self.event),
                        elapsed_s,
                    )?;
                    self.sm.wait_for_single_event(&self.event, State::Arrived)?;
                }
                Some(State::Arrived) => {
                    self.resolution = self.sm.last_resolution();
                    self.sm.stop();
                }
                None => (),
            }

            Ok(!self.sm.is_enabled())
        }

        fn state_name(&self) -> Option<String> {
            self.sm.get_state().map(|s| format!("{:?}", s))
        }
    }

    fn robot() -> Robot {
        let axis = PidParams::new(PidCoefficients::new(0.1, 0.0, 0.0), 0.5);
        let params = pid_drive::Params {
            x: axis,
            y: axis,
            turn: axis,
            abs_target_mode: Axes::default(),
        };

        Robot::new(
            Box::new(PlacedBase(Pose2D::default())),
            PidDrive::new(&params),
            Box::new(LogDashboard::new()),
        )
    }

    /// Start the move, then place the robot on its target so the next cycle
    /// would finish it.
    fn start_one_cycle_from_target(cmd: &mut BumpCmd, robot: &mut Robot) {
        assert!(!run_cycle(cmd, robot, 0.0));
        assert!(robot.pid_drive.is_active());

        robot
            .drive_base
            .set_field_position(Pose2D::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn test_drive_reaches_target() {
        let bumped = Rc::new(Cell::new(false));
        let mut cmd = BumpCmd::new(bumped);
        let mut robot = robot();

        start_one_cycle_from_target(&mut cmd, &mut robot);

        assert!(!run_cycle(&mut cmd, &mut robot, 0.02));
        assert_eq!(robot.pid_drive.last_outcome(), Some(DriveOutcome::OnTarget));

        assert!(run_cycle(&mut cmd, &mut robot, 0.04));
        assert_eq!(
            cmd.resolution,
            Some(WaitResolution::Signaled(Some(EventData::Drive(
                DriveOutcome::OnTarget
            ))))
        );
    }

    #[test]
    fn test_trigger_wins_over_on_target() {
        let bumped = Rc::new(Cell::new(false));
        let mut cmd = BumpCmd::new(bumped.clone());
        let mut robot = robot();

        start_one_cycle_from_target(&mut cmd, &mut robot);

        // The bumper edge arrives on the cycle the drive would settle
        bumped.set(true);
        assert!(run_cycle(&mut cmd, &mut robot, 0.02));

        assert_eq!(cmd.resolution, Some(WaitResolution::Cancelled));
        assert_eq!(robot.pid_drive.last_outcome(), None);
        assert!(!robot.pid_drive.is_active());
        assert!(!cmd.event.is_signaled());
    }
}
