//! # Loading zone autonomous routine
//!
//! Starting against the wall in the loading zone: find a skystone with the
//! [`CmdSkystoneVision`] sub-command, carry it under the bridge onto the
//! foundation, come back for the second skystone and deliver it too. The
//! routine then optionally hooks the foundation, drags it back to the wall,
//! pushes it into the building site and parks.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};

// Internal
use super::{
    field::*,
    params::{AutoChoices, ParkPosition},
    skystone_vision::{CmdSkystoneVision, VisionParams},
};
use crate::{
    event::{DriveOutcome, Event, EventData},
    pid_ctrl::PidCoefficients,
    pose::{Axis, Pose2D},
    robot::Robot,
    robot_cmd::{CmdError, RobotCommand},
    state_machine::StateMachine,
    timer::Timer,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct CmdAutoLoadingZone {
    choices: AutoChoices,
    event: Event,
    timer: Timer,
    sm: StateMachine<State>,
    vision: CmdSkystoneVision,

    /// Number of stones dropped on the foundation
    stones_delivered: u32,

    /// Field X the first skystone was grabbed from
    first_skystone_x: Option<f64>,

    /// Y gains saved while dragging the foundation
    saved_y_coeffs: Option<PidCoefficients>,

    limits_saved: bool,

    /// True once a grabber or latch move has been started on the routine's
    /// event
    actuators_moved: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Begin,
    StartDelay,
    MoveToSkystoneLine,
    MoveToFirstStone,
    DoVision,
    GrabSkystone,
    PullSkystone,
    GotoFoundation,
    ApproachFoundation,
    DropSkystone,
    BackOffFoundation,
    MoveBackToSkystones,
    HookFoundation,
    FinishDelay,
    PullFoundationToWall,
    UnhookFoundation,
    ClearOfFoundation,
    MoveToFoundationSide,
    TurnToFoundation,
    PushFoundation,
    MoveBackToWall,
    MoveUnderBridge,
    SkipMoveFoundationPark,
    Done,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CmdAutoLoadingZone {
    /// Create and start the routine.
    ///
    /// The robot must carry a stone grabber.
    pub fn new(robot: &Robot, choices: &AutoChoices) -> Result<Self, CmdError> {
        if robot.grabber.is_none() {
            return Err(CmdError::MissingEquipment("grabber"));
        }

        let mut sm = StateMachine::new("CmdAutoLoadingZone");
        sm.start(State::Begin)?;

        Ok(Self {
            choices: choices.clone(),
            event: Event::new("loading_zone"),
            timer: Timer::new("loading_zone"),
            sm,
            vision: CmdSkystoneVision::new(choices, VisionParams::from_choices(choices)),
            stones_delivered: 0,
            first_skystone_x: None,
            saved_y_coeffs: None,
            limits_saved: false,
            actuators_moved: false,
        })
    }

    /// Field pose the routine expects to start from.
    pub fn start_pose(choices: &AutoChoices) -> Pose2D {
        Pose2D::new(
            LOADING_ZONE_START_X * choices.alliance.direction(),
            ROBOT_START_Y,
            0.0,
        )
    }

    pub fn stones_delivered(&self) -> u32 {
        self.stones_delivered
    }

    /// Event the routine's waits are signaled through.
    pub fn event(&self) -> &Event {
        &self.event
    }

    fn restore_drive_settings(&mut self, robot: &mut Robot) {
        if self.limits_saved {
            robot.pid_drive.restore_output_limit();
            self.limits_saved = false;
        }

        if let Some(coeffs) = self.saved_y_coeffs.take() {
            robot
                .pid_drive
                .controller_mut(Axis::Y)
                .set_pid_coefficients(coeffs);
        }
    }

    /// Start a timed delay, or fall straight through when there is none.
    fn delay(
        &mut self,
        delay_s: f64,
        next: State,
        now_s: f64,
    ) -> Result<Option<State>, CmdError> {
        if delay_s > 0.0 {
            self.timer.set(delay_s, &self.event, now_s);
            self.sm.wait_for_single_event(&self.event, next)?;
            Ok(None)
        }
        else {
            Ok(Some(self.sm.fall_through(next)?))
        }
    }

    fn move_x_to(
        &mut self,
        robot: &mut Robot,
        x: f64,
        next: State,
        now_s: f64,
    ) -> Result<Option<State>, CmdError> {
        robot.pid_drive.set_absolute_x_target(
            robot.drive_base.as_ref(),
            x,
            Some(&self.event),
            now_s,
        )?;
        self.sm.wait_for_single_event(&self.event, next)?;
        Ok(None)
    }

    fn move_y_to(
        &mut self,
        robot: &mut Robot,
        y: f64,
        next: State,
        now_s: f64,
    ) -> Result<Option<State>, CmdError> {
        robot.pid_drive.set_absolute_y_target(
            robot.drive_base.as_ref(),
            y,
            Some(&self.event),
            now_s,
        )?;
        self.sm.wait_for_single_event(&self.event, next)?;
        Ok(None)
    }

    fn move_y_by(
        &mut self,
        robot: &mut Robot,
        dy: f64,
        next: State,
        now_s: f64,
    ) -> Result<Option<State>, CmdError> {
        robot.pid_drive.set_relative_y_target(
            robot.drive_base.as_ref(),
            dy,
            Some(&self.event),
            now_s,
        )?;
        self.sm.wait_for_single_event(&self.event, next)?;
        Ok(None)
    }

    /// The state which parks the robot from the foundation side.
    fn park_state(&self) -> State {
        match self.choices.park {
            ParkPosition::NoPark => State::Done,
            ParkPosition::CloseToWall => State::MoveBackToWall,
            ParkPosition::CloseToCenter => State::MoveUnderBridge,
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
            State::Begin => {
                let start = Self::start_pose(&self.choices);
                robot
                    .pid_drive
                    .set_absolute_pose(robot.drive_base.as_mut(), start)?;
                robot.pid_drive.set_no_oscillation(true);

                Ok(Some(self.sm.fall_through(State::StartDelay)?))
            }
            State::StartDelay => {
                self.delay(self.choices.start_delay_s, State::MoveToSkystoneLine, now_s)
            }
            State::MoveToSkystoneLine => {
                robot
                    .pid_drive
                    .save_and_set_output_limit(self.choices.slow_output_limit);
                self.limits_saved = true;

                if let Some(ref mut grabber) = robot.grabber {
                    grabber.release(None, now_s);
                }

                self.move_y_by(
                    robot,
                    SKYSTONE_LINE_DISTANCE,
                    State::MoveToFirstStone,
                    now_s,
                )
            }
            State::MoveToFirstStone => {
                self.move_x_to(robot, FAR_STONE1_X * direction, State::DoVision, now_s)
            }
            State::DoVision => {
                self.vision.start()?;

                if self.vision.periodic_step(robot, now_s)? {
                    Ok(Some(self.sm.fall_through(State::GrabSkystone)?))
                }
                else {
                    Ok(None)
                }
            }
            State::GrabSkystone => match robot.grabber {
                Some(ref mut grabber) => {
                    if self.first_skystone_x.is_none() {
                        self.first_skystone_x = self.vision.get_skystone_x_pos();
                    }

                    grabber.grab(Some(&self.event), now_s);
                    self.actuators_moved = true;
                    self.sm.wait_for_single_event(&self.event, State::PullSkystone)?;
                    Ok(None)
                }
                None => Err(CmdError::MissingEquipment("grabber")),
            },
            State::PullSkystone => {
                self.move_y_by(robot, -PULL_STONE_DISTANCE, State::GotoFoundation, now_s)
            }
            State::GotoFoundation => {
                if self.limits_saved {
                    robot.pid_drive.restore_output_limit();
                    self.limits_saved = false;
                }

                let drop_x = if self.stones_delivered == 0 {
                    FOUNDATION_DROP_FAR_X
                }
                else {
                    FOUNDATION_DROP_NEAR_X
                };

                self.move_x_to(robot, drop_x * direction, State::ApproachFoundation, now_s)
            }
            State::ApproachFoundation => self.move_y_by(
                robot,
                FOUNDATION_APPROACH_DISTANCE,
                State::DropSkystone,
                now_s,
            ),
            State::DropSkystone => {
                let next = if self.stones_delivered == 0 {
                    State::BackOffFoundation
                }
                else if self.choices.move_foundation {
                    State::HookFoundation
                }
                else {
                    State::SkipMoveFoundationPark
                };
                self.stones_delivered += 1;

                match robot.grabber {
                    Some(ref mut grabber) => {
                        grabber.release(Some(&self.event), now_s);
                        self.actuators_moved = true;
                        self.sm.wait_for_single_event(&self.event, next)?;
                        Ok(None)
                    }
                    None => Err(CmdError::MissingEquipment("grabber")),
                }
            }
            State::BackOffFoundation => self.move_y_by(
                robot,
                -FOUNDATION_APPROACH_DISTANCE,
                State::MoveBackToSkystones,
                now_s,
            ),
            State::MoveBackToSkystones => {
                let first_x = self
                    .first_skystone_x
                    .unwrap_or(FAR_STONE1_X * direction);
                let mut target_x = first_x - SKYSTONE_SPACING * direction;

                if target_x * direction < LAST_REACHABLE_STONE_X {
                    info!(
                        "Second skystone at x={:.1} is out of reach, taking a stone at x={:.1}",
                        target_x,
                        FAR_STONE3_X * direction
                    );
                    target_x = FAR_STONE3_X * direction;
                }

                // The second stone is known from the first, no scooting
                let params = self.vision.params_mut();
                params.scoot_count = 0;
                params.assume_left_if_not_found = false;

                self.move_x_to(robot, target_x, State::DoVision, now_s)
            }
            State::HookFoundation => match robot.foundation_latch {
                Some(ref mut latch) => {
                    latch.grab(Some(&self.event), now_s);
                    self.actuators_moved = true;
                    self.sm.wait_for_single_event(&self.event, State::FinishDelay)?;
                    Ok(None)
                }
                None => {
                    warn!("No foundation latch, leaving the foundation");
                    Ok(Some(self.sm.fall_through(State::SkipMoveFoundationPark)?))
                }
            },
            State::FinishDelay => self.delay(
                self.choices.finish_delay_s,
                State::PullFoundationToWall,
                now_s,
            ),
            State::PullFoundationToWall => {
                let ctrl = robot.pid_drive.controller_mut(Axis::Y);
                let mut coeffs = ctrl.get_pid_coefficients();
                if self.saved_y_coeffs.is_none() {
                    self.saved_y_coeffs = Some(coeffs);
                }
                coeffs.k_p = self.choices.loaded_y_k_p;
                ctrl.set_pid_coefficients(coeffs);

                // Overdrives into the wall, the segment ends in a stall
                self.move_y_by(
                    robot,
                    -PULL_FOUNDATION_DISTANCE,
                    State::UnhookFoundation,
                    now_s,
                )
            }
            State::UnhookFoundation => {
                if let Some(EventData::Drive(DriveOutcome::OnTarget)) =
                    self.sm.last_event_data()
                {
                    warn!("Foundation pull ended on target, not against the wall");
                }

                if let Some(coeffs) = self.saved_y_coeffs.take() {
                    robot
                        .pid_drive
                        .controller_mut(Axis::Y)
                        .set_pid_coefficients(coeffs);
                }

                // Against the wall, the wheels slipped while dragging
                let mut pose = robot.drive_base.get_field_position();
                pose.y = ROBOT_START_Y;
                robot.drive_base.set_field_position(pose);

                let mut target = robot.pid_drive.get_absolute_target_pose();
                target.y = ROBOT_START_Y;
                robot.pid_drive.set_absolute_target_pose(target)?;

                match robot.foundation_latch {
                    Some(ref mut latch) => {
                        latch.release(Some(&self.event), now_s);
                        self.actuators_moved = true;
                        self.sm
                            .wait_for_single_event(&self.event, State::ClearOfFoundation)?;
                        Ok(None)
                    }
                    None => Ok(Some(self.sm.fall_through(State::ClearOfFoundation)?)),
                }
            }
            State::ClearOfFoundation => self.move_x_to(
                robot,
                NEXT_TO_PARTNER_PARK_X * direction,
                State::MoveToFoundationSide,
                now_s,
            ),
            State::MoveToFoundationSide => self.move_y_to(
                robot,
                CENTER_BRIDGE_PARK_Y,
                State::TurnToFoundation,
                now_s,
            ),
            State::TurnToFoundation => {
                robot.pid_drive.set_absolute_heading_target(
                    robot.drive_base.as_ref(),
                    FACE_FOUNDATION_HEADING * direction,
                    Some(&self.event),
                    now_s,
                )?;
                self.sm
                    .wait_for_single_event(&self.event, State::PushFoundation)?;
                Ok(None)
            }
            State::PushFoundation => {
                let next = self.park_state();

                robot.pid_drive.set_relative_x_target(
                    robot.drive_base.as_ref(),
                    PUSH_FOUNDATION_DISTANCE * direction,
                    Some(&self.event),
                    now_s,
                )?;
                self.sm.wait_for_single_event(&self.event, next)?;
                Ok(None)
            }
            State::MoveBackToWall => {
                self.move_y_to(robot, ROBOT_START_Y, State::MoveUnderBridge, now_s)
            }
            State::MoveUnderBridge => self.move_x_to(
                robot,
                UNDER_BRIDGE_PARK_X * direction,
                State::Done,
                now_s,
            ),
            State::SkipMoveFoundationPark => match self.choices.park {
                ParkPosition::NoPark => Ok(Some(self.sm.fall_through(State::Done)?)),
                ParkPosition::CloseToWall => {
                    self.move_y_to(robot, ROBOT_START_Y, State::MoveUnderBridge, now_s)
                }
                ParkPosition::CloseToCenter => self.move_y_to(
                    robot,
                    CENTER_BRIDGE_PARK_Y,
                    State::MoveUnderBridge,
                    now_s,
                ),
            },
            State::Done => {
                info!(
                    "Loading zone routine done, {} stones delivered",
                    self.stones_delivered
                );
                self.restore_drive_settings(robot);
                self.sm.stop();
                Ok(None)
            }
        }
    }
}

impl RobotCommand for CmdAutoLoadingZone {
    fn name(&self) -> &str {
        self.sm.name()
    }

    fn is_active(&self) -> bool {
        self.sm.is_enabled()
    }

    fn cancel(&mut self, robot: &mut Robot) {
        if self.vision.is_active() {
            self.vision.cancel(robot);
        }

        self.timer.cancel();

        if robot.pid_drive.is_active() {
            robot.cancel_drive();
        }

        if self.actuators_moved {
            robot.cancel_actuator_moves();
        }

        self.restore_drive_settings(robot);
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
                    .display_printf(0, format_args!("State: {:?}", state));

                while let Some(next) = self.exec_state(state, robot, elapsed_s)? {
                    state = next;
                }
            }
            None => robot
                .dashboard
                .display_printf(0, format_args!("State: disabled or waiting...")),
        }

        Ok(!self.sm.is_enabled())
    }

    fn state_name(&self) -> Option<String> {
        self.sm.get_state().map(|s| format!("{:?}", s))
    }
}
