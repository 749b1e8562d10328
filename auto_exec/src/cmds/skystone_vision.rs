//! # Skystone vision command
//!
//! Finds a skystone in the set of stones in front of the robot and drives up
//! to it, ready to grab. The command either strafes across the stones with a
//! vision trigger that interrupts the strafe as soon as a skystone is seen, or
//! polls vision in front of each stone, moving on to the next stone when vision
//! times out.
//!
//! The command is normally run as a sub-command of a full routine, which starts
//! it and steps it from one of its own states.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use std::{cell::Cell, rc::Rc};

// Internal
use super::{field::*, params::AutoChoices};
use crate::{
    event::Event,
    pose::Pose2D,
    robot::Robot,
    robot_cmd::{CmdError, RobotCommand},
    state_machine::StateMachine,
    trigger::Trigger,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the vision command.
#[derive(Debug, Clone)]
pub struct VisionParams {
    pub use_vision_trigger: bool,
    pub assume_left_if_not_found: bool,

    /// Scan and scoot towards the loading zone wall, otherwise towards the
    /// bridge
    pub scan_towards_wall: bool,

    /// Number of stones to move on by when vision finds nothing
    pub scoot_count: u32,

    pub grabber_offset_x: f64,
    pub grabber_offset_y: f64,
    pub vision_timeout_s: f64,
}

pub struct CmdSkystoneVision {
    params: VisionParams,
    alliance_direction: f64,
    event: Event,
    sm: StateMachine<State>,
    vision_trigger: Option<Trigger<Robot>>,

    /// Pose seen by the vision trigger
    trigger_pose: Rc<Cell<Option<Pose2D>>>,

    /// The accepted skystone detection
    skystone_pose: Option<Pose2D>,

    vision_deadline_s: f64,

    /// X position the robot grabbed the skystone from
    skystone_x_pos: Option<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    ScanForSkystone,
    SetupVision,
    GetTargetPose,
    AlignSkystone,
    GotoSkystone,
    AlignSecondSkystone,
    Done,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisionParams {
    pub fn from_choices(choices: &AutoChoices) -> Self {
        Self {
            use_vision_trigger: choices.use_vision_trigger,
            assume_left_if_not_found: choices.assume_left_if_not_found,
            scan_towards_wall: true,
            scoot_count: choices.scoot_count,
            grabber_offset_x: choices.grabber_offset_x,
            grabber_offset_y: choices.grabber_offset_y,
            vision_timeout_s: choices.vision_timeout_s,
        }
    }
}

impl CmdSkystoneVision {
    pub fn new(choices: &AutoChoices, params: VisionParams) -> Self {
        let trigger_pose = Rc::new(Cell::new(None));

        let vision_trigger = if params.use_vision_trigger {
            let slot = trigger_pose.clone();

            Some(Trigger::new(
                "vision_trigger",
                Box::new(move |robot: &mut Robot| {
                    let pose = robot.vision.as_mut().and_then(|v| v.get_target_pose());
                    if let Some(p) = pose {
                        info!("Vision trigger: skystone at x={:.1}, y={:.1}", p.x, p.y);
                        slot.set(pose);
                    }
                    pose.is_some()
                }),
                Some(Box::new(|robot: &mut Robot| {
                    if robot.pid_drive.is_active() {
                        robot.cancel_drive();
                    }
                })),
            ))
        }
        else {
            None
        };

        Self {
            params,
            alliance_direction: choices.alliance.direction(),
            event: Event::new("skystone_vision"),
            sm: StateMachine::new("CmdSkystoneVision"),
            vision_trigger,
            trigger_pose,
            skystone_pose: None,
            vision_deadline_s: 0.0,
            skystone_x_pos: None,
        }
    }

    /// Start the command if it isn't already running.
    pub fn start(&mut self) -> Result<(), CmdError> {
        if self.sm.is_enabled() {
            return Ok(());
        }

        self.skystone_pose = None;
        self.trigger_pose.set(None);

        let initial = if self.vision_trigger.is_some() {
            State::ScanForSkystone
        }
        else {
            State::SetupVision
        };

        self.sm.start(initial)?;
        Ok(())
    }

    /// X position of the last skystone the command drove up to.
    pub fn get_skystone_x_pos(&self) -> Option<f64> {
        self.skystone_x_pos
    }

    pub fn params_mut(&mut self) -> &mut VisionParams {
        &mut self.params
    }

    /// Field X sign of the scan direction.
    fn scan_sign(&self) -> f64 {
        let towards = if self.params.scan_towards_wall { -1.0 } else { 1.0 };
        towards * self.alliance_direction
    }

    fn set_trigger_enabled(&mut self, enabled: bool) {
        if let Some(ref mut trigger) = self.vision_trigger {
            trigger.set_enabled(enabled);
        }
    }

    /// Execute `state`, returning the next state if it falls through.
    fn exec_state(
        &mut self,
        state: State,
        robot: &mut Robot,
        now_s: f64,
    ) -> Result<Option<State>, CmdError> {
        match state {
            State::ScanForSkystone => {
                // The strafe is interrupted by the trigger when a skystone is
                // seen
                self.set_trigger_enabled(true);

                let x = SKYSTONE_SCAN_DISTANCE * self.scan_sign();
                robot.pid_drive.set_relative_x_target(
                    robot.drive_base.as_ref(),
                    x,
                    Some(&self.event),
                    now_s,
                )?;
                self.sm.wait_for_single_event(&self.event, State::AlignSkystone)?;
                Ok(None)
            }
            State::SetupVision => {
                self.vision_deadline_s = now_s + self.params.vision_timeout_s;
                Ok(Some(self.sm.fall_through(State::GetTargetPose)?))
            }
            State::GetTargetPose => {
                let pose = robot.vision.as_mut().and_then(|v| v.get_target_pose());

                match pose {
                    Some(p) => {
                        if p.x.abs() > MAX_SKYSTONE_OFFSET {
                            warn!("Skystone detection at x={:.1} is implausible, ignored", p.x);
                            self.skystone_pose = None;
                        }
                        else {
                            info!("Skystone found at x={:.1}, y={:.1}", p.x, p.y);
                            self.skystone_pose = Some(p);
                        }
                        Ok(Some(self.sm.fall_through(State::AlignSkystone)?))
                    }
                    None if now_s > self.vision_deadline_s => {
                        if self.params.scoot_count > 0 {
                            self.params.scoot_count -= 1;

                            // Nothing found on the last stone to check means it
                            // must be the skystone
                            let next = if self.params.scoot_count == 0 {
                                info!("Skystone not found, moving to the last stone");
                                State::AlignSkystone
                            }
                            else {
                                info!("Skystone not found, trying the next stone");
                                State::SetupVision
                            };

                            robot.pid_drive.set_relative_x_target(
                                robot.drive_base.as_ref(),
                                STONE_PITCH * self.scan_sign(),
                                Some(&self.event),
                                now_s,
                            )?;
                            self.sm.wait_for_single_event(&self.event, next)?;
                            Ok(None)
                        }
                        else {
                            if self.params.assume_left_if_not_found {
                                info!("Skystone not found, assuming it is to the left");
                            }
                            else {
                                info!("Skystone not found, giving up");
                            }
                            Ok(Some(self.sm.fall_through(State::AlignSkystone)?))
                        }
                    }
                    // Keep polling until the vision timeout
                    None => Ok(None),
                }
            }
            State::AlignSkystone => {
                self.set_trigger_enabled(false);

                if self.skystone_pose.is_none() {
                    self.skystone_pose = self.trigger_pose.take();
                }

                let x = match self.skystone_pose {
                    Some(p) => Some(p.x + self.params.grabber_offset_x),
                    None if self.params.assume_left_if_not_found => Some(-STONE_PITCH),
                    None => None,
                };

                match (x, self.skystone_x_pos) {
                    (Some(x), _) => {
                        robot.pid_drive.set_relative_x_target(
                            robot.drive_base.as_ref(),
                            x,
                            Some(&self.event),
                            now_s,
                        )?;
                        self.sm.wait_for_single_event(&self.event, State::GotoSkystone)?;
                        Ok(None)
                    }
                    (None, Some(_)) => {
                        // Going for the second skystone without a detection,
                        // bump the wall to realign X and go to the known spot
                        info!("Second skystone not detected, realigning on the wall");
                        robot.pid_drive.set_absolute_x_target(
                            robot.drive_base.as_ref(),
                            WALL_X * self.alliance_direction,
                            Some(&self.event),
                            now_s,
                        )?;
                        self.sm
                            .wait_for_single_event(&self.event, State::AlignSecondSkystone)?;
                        Ok(None)
                    }
                    // Assume the stone in front is the skystone
                    (None, None) => Ok(Some(self.sm.fall_through(State::GotoSkystone)?)),
                }
            }
            State::GotoSkystone => {
                self.skystone_x_pos = Some(robot.drive_base.get_x_position());

                robot.pid_drive.set_absolute_y_target(
                    robot.drive_base.as_ref(),
                    GRAB_SKYSTONE_Y - self.params.grabber_offset_y,
                    Some(&self.event),
                    now_s,
                )?;
                self.sm.wait_for_single_event(&self.event, State::Done)?;
                Ok(None)
            }
            State::AlignSecondSkystone => {
                // Against the wall, rebase the X odometry
                let wall_x = WALL_X * self.alliance_direction;

                let mut pose = robot.drive_base.get_field_position();
                pose.x = wall_x;
                robot.drive_base.set_field_position(pose);

                let mut target = robot.pid_drive.get_absolute_target_pose();
                target.x = wall_x;
                robot.pid_drive.set_absolute_target_pose(target)?;

                let first_x = self.skystone_x_pos.unwrap_or(wall_x);
                robot.pid_drive.set_absolute_x_target(
                    robot.drive_base.as_ref(),
                    first_x - SKYSTONE_SPACING * self.alliance_direction,
                    Some(&self.event),
                    now_s,
                )?;
                self.sm.wait_for_single_event(&self.event, State::GotoSkystone)?;
                Ok(None)
            }
            State::Done => {
                self.cancel(robot);
                Ok(None)
            }
        }
    }
}

impl RobotCommand for CmdSkystoneVision {
    fn name(&self) -> &str {
        self.sm.name()
    }

    fn is_active(&self) -> bool {
        self.sm.is_enabled()
    }

    fn cancel(&mut self, robot: &mut Robot) {
        // The drive may belong to a parent routine once this has stopped
        if !self.sm.is_enabled() {
            return;
        }

        if robot.pid_drive.is_active() {
            robot.cancel_drive();
        }

        self.set_trigger_enabled(false);
        self.sm.stop();
    }

    fn periodic_step(
        &mut self,
        robot: &mut Robot,
        elapsed_s: f64,
    ) -> Result<bool, CmdError> {
        if let Some(ref mut trigger) = self.vision_trigger {
            trigger.update(robot);
        }

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
