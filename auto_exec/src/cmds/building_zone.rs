//! # Building zone autonomous routine
//!
//! Starting against the wall in the building zone with the foundation hooks
//! facing the foundation: back up to the foundation, latch it, drag it back
//! into the building site, release it and strafe to park on the line under the
//! bridge.
//!
//! Every drive segment goes through an [`AbsTargetDrive`], so the foundation
//! is dragged back exactly as far as the robot moved out, whatever shortfall
//! the first segment ended with.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::{
    field::*,
    params::{AutoChoices, ParkPosition},
};
use crate::{
    abs_target_drive::AbsTargetDrive,
    event::Event,
    pose::Axis,
    robot::Robot,
    robot_cmd::{CmdError, RobotCommand},
    state_machine::StateMachine,
    timer::Timer,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct CmdAutoBuildingZone {
    choices: AutoChoices,
    event: Event,
    timer: Timer,
    sm: StateMachine<State>,
    abs_target_drive: AbsTargetDrive,

    /// True while the drive output limits are throttled
    limits_saved: bool,

    /// True once a latch move has been started on the routine's event
    latch_moved: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    DoDelay,
    MoveToFoundation,
    HookFoundation,
    MoveFoundationBack,
    LetGoFoundation,
    ScootToLine,
    Done,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CmdAutoBuildingZone {
    /// Create and start the routine from the robot's current position.
    pub fn new(robot: &Robot, choices: &AutoChoices) -> Result<Self, CmdError> {
        let event = Event::new("building_zone");
        let abs_target_drive = AbsTargetDrive::new("building_zone", robot, &event)?;

        let mut sm = StateMachine::new("CmdAutoBuildingZone");
        sm.start(State::DoDelay)?;

        Ok(Self {
            choices: choices.clone(),
            event,
            timer: Timer::new("building_zone"),
            sm,
            abs_target_drive,
            limits_saved: false,
            latch_moved: false,
        })
    }

    /// Event the routine's waits are signaled through.
    pub fn event(&self) -> &Event {
        &self.event
    }

    fn restore_limits(&mut self, robot: &mut Robot) {
        if self.limits_saved {
            robot.pid_drive.controller_mut(Axis::X).restore_output_limit();
            robot.pid_drive.controller_mut(Axis::Y).restore_output_limit();
            self.limits_saved = false;
        }
    }

    fn exec_state(
        &mut self,
        state: State,
        robot: &mut Robot,
        now_s: f64,
    ) -> Result<Option<State>, CmdError> {
        let direction = self.choices.alliance.direction();

        match state {
            State::DoDelay => {
                let limit = self.choices.slow_output_limit;
                robot
                    .pid_drive
                    .controller_mut(Axis::X)
                    .save_and_set_output_limit(limit);
                robot
                    .pid_drive
                    .controller_mut(Axis::Y)
                    .save_and_set_output_limit(limit);
                self.limits_saved = true;

                if self.choices.start_delay_s == 0.0 {
                    Ok(Some(self.sm.fall_through(State::MoveToFoundation)?))
                }
                else {
                    self.timer.set(self.choices.start_delay_s, &self.event, now_s);
                    self.sm
                        .wait_for_single_event(&self.event, State::MoveToFoundation)?;
                    Ok(None)
                }
            }
            State::MoveToFoundation => {
                if !self.choices.move_foundation {
                    return Ok(Some(self.sm.fall_through(State::ScootToLine)?));
                }

                // Backwards, so the hooks face the foundation
                self.abs_target_drive.set_y_target(
                    robot,
                    &mut self.sm,
                    FOUNDATION_BACKUP_DISTANCE,
                    State::HookFoundation,
                    now_s,
                )?;
                Ok(None)
            }
            State::HookFoundation => match robot.foundation_latch {
                Some(ref mut latch) => {
                    latch.grab(Some(&self.event), now_s);
                    self.latch_moved = true;
                    self.sm
                        .wait_for_single_event(&self.event, State::MoveFoundationBack)?;
                    Ok(None)
                }
                None => Ok(Some(self.sm.fall_through(State::MoveFoundationBack)?)),
            },
            State::MoveFoundationBack => {
                self.abs_target_drive.set_y_target(
                    robot,
                    &mut self.sm,
                    -FOUNDATION_BACKUP_DISTANCE,
                    State::LetGoFoundation,
                    now_s,
                )?;
                Ok(None)
            }
            State::LetGoFoundation => match robot.foundation_latch {
                Some(ref mut latch) => {
                    latch.release(Some(&self.event), now_s);
                    self.latch_moved = true;
                    self.sm.wait_for_single_event(&self.event, State::ScootToLine)?;
                    Ok(None)
                }
                None => Ok(Some(self.sm.fall_through(State::ScootToLine)?)),
            },
            State::ScootToLine => {
                if self.choices.park == ParkPosition::NoPark {
                    return Ok(Some(self.sm.fall_through(State::Done)?));
                }

                self.abs_target_drive.set_x_target(
                    robot,
                    &mut self.sm,
                    -LINE_SCOOT_DISTANCE * direction,
                    State::Done,
                    now_s,
                )?;
                Ok(None)
            }
            State::Done => {
                self.restore_limits(robot);
                self.sm.stop();
                Ok(None)
            }
        }
    }
}

impl RobotCommand for CmdAutoBuildingZone {
    fn name(&self) -> &str {
        self.sm.name()
    }

    fn is_active(&self) -> bool {
        self.sm.is_enabled()
    }

    fn cancel(&mut self, robot: &mut Robot) {
        self.timer.cancel();

        if robot.pid_drive.is_active() {
            self.abs_target_drive.cancel(robot);
        }

        if self.latch_moved {
            robot.cancel_actuator_moves();
        }

        self.restore_limits(robot);
        self.sm.stop();
    }

    fn periodic_step(
        &mut self,
        robot: &mut Robot,
        elapsed_s: f64,
    ) -> Result<bool, CmdError> {
        self.timer.update(elapsed_s);

        match self.sm.check_ready_and_get_state() {
            Some(mut state) => {
                robot
                    .dashboard
                    .display_printf(1, format_args!("State: {:?}", state));

                while let Some(next) = self.exec_state(state, robot, elapsed_s)? {
                    state = next;
                }
            }
            None => robot
                .dashboard
                .display_printf(1, format_args!("State: disabled or waiting...")),
        }

        Ok(!self.sm.is_enabled())
    }

    fn state_name(&self) -> Option<String> {
        self.sm.get_state().map(|s| format!("{:?}", s))
    }
}
