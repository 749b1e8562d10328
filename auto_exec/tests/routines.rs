//! # Routine tests
//!
//! Runs the routines on the simulated robot through the control cycle runner.

use std::{cell::Cell, rc::Rc};

use auto_lib::{
    cmds::{
        Alliance, AutoChoices, CmdAutoBuildingZone, CmdAutoLoadingZone, CmdSkystoneVision,
        ParkPosition, Routine, VisionParams,
    },
    eqpt::VisionOracle,
    pid_drive::{self, PidDrive},
    pose::{Axis, Pose2D},
    robot::Robot,
    robot_cmd::{run_cycle, CmdError, RobotCommand},
    sim::{self, LogDashboard, SimDriveBase},
};

const CYCLE_PERIOD_S: f64 = 0.02;

/// Position tolerance of the assertions, the drive tolerance plus margin.
const POS_TOL: f64 = 1.5;

struct Harness {
    robot: Robot,
    truth: Rc<Cell<Pose2D>>,
    t: f64,
}

fn pid_params() -> pid_drive::Params {
    util::params::parse(include_str!("../../params/pid_drive.toml")).unwrap()
}

fn harness(sim_params: &sim::Params, start: Pose2D, choices: &AutoChoices) -> Harness {
    let (robot, truth) = sim::build_robot(
        sim_params,
        PidDrive::new(&pid_params()),
        start,
        choices.alliance.direction(),
    );

    Harness {
        robot,
        truth,
        t: 0.0,
    }
}

impl Harness {
    /// Run `cmd` until it finishes, returning false if it runs out of time.
    fn run(&mut self, cmd: &mut dyn RobotCommand, max_s: f64) -> bool {
        while self.t < max_s {
            let done = run_cycle(cmd, &mut self.robot, self.t);
            self.t += CYCLE_PERIOD_S;

            if done {
                return true;
            }
        }

        false
    }

    /// Run `cmd` until it reports `state`, returning false if it finishes or
    /// runs out of time first.
    fn run_until_state(&mut self, cmd: &mut dyn RobotCommand, state: &str, max_s: f64) -> bool {
        while self.t < max_s {
            let done = run_cycle(cmd, &mut self.robot, self.t);
            self.t += CYCLE_PERIOD_S;

            if done {
                return false;
            }
            if cmd.state_name().as_deref() == Some(state) {
                return true;
            }
        }

        false
    }

    /// Step only the robot, as the cycle runner does once no command is active.
    fn run_robot(&mut self, duration_s: f64) {
        let end_s = self.t + duration_s;
        while self.t < end_s {
            self.robot.periodic(self.t);
            self.t += CYCLE_PERIOD_S;
        }
    }

    fn assert_at(&self, x: f64, y: f64) {
        let pose = self.truth.get();
        assert!(
            (pose.x - x).abs() < POS_TOL && (pose.y - y).abs() < POS_TOL,
            "expected robot at ({}, {}), found {}",
            x,
            y,
            pose
        );
    }
}

/// Reports a detection at a fixed offset every time it is polled.
struct FixedVision(Pose2D);

impl VisionOracle for FixedVision {
    fn get_target_pose(&mut self) -> Option<Pose2D> {
        Some(self.0)
    }
}

#[test]
fn test_vision_skystone_in_front() {
    let mut sim_params = sim::Params::default();
    sim_params.skystone_xs = vec![-24.0, -48.0];

    let choices = AutoChoices::default();
    let start = Routine::SkystoneVision.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);

    let mut cmd = CmdSkystoneVision::new(&choices, VisionParams::from_choices(&choices));
    cmd.start().unwrap();

    assert!(h.run(&mut cmd, 10.0));
    assert!(!cmd.is_active());

    h.assert_at(-24.0, 40.0);
    assert!((cmd.get_skystone_x_pos().unwrap() + 24.0).abs() < POS_TOL);

    // Found on the first poll, no vision timeout
    assert!(h.t < 2.0);
}

#[test]
fn test_vision_scoots_to_last_stone() {
    let mut sim_params = sim::Params::default();
    sim_params.skystone_xs = vec![-40.0, -64.0];

    let choices = AutoChoices::default();
    let start = Routine::SkystoneVision.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);

    let mut cmd = CmdSkystoneVision::new(&choices, VisionParams::from_choices(&choices));
    cmd.start().unwrap();

    assert!(h.run(&mut cmd, 15.0));

    // Two stones checked, the third taken without looking
    h.assert_at(-40.0, 40.0);
    assert!((cmd.get_skystone_x_pos().unwrap() + 40.0).abs() < POS_TOL);
    assert!(h.t > 2.0 * choices.vision_timeout_s);
}

#[test]
fn test_vision_trigger_interrupts_scan() {
    let mut sim_params = sim::Params::default();
    sim_params.skystone_xs = vec![-32.0, -56.0];

    let mut choices = AutoChoices::default();
    choices.use_vision_trigger = true;

    let start = Routine::SkystoneVision.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);

    let mut cmd = CmdSkystoneVision::new(&choices, VisionParams::from_choices(&choices));
    cmd.start().unwrap();

    assert!(h.run(&mut cmd, 10.0));

    // The full scan would have ended at x = -48
    h.assert_at(-32.0, 40.0);
    assert!(!h.robot.pid_drive.is_active());
}

#[test]
fn test_vision_rejects_implausible_detection() {
    let sim_params = sim::Params::default();

    let mut choices = AutoChoices::default();
    choices.scoot_count = 0;
    choices.assume_left_if_not_found = true;

    let start = Routine::SkystoneVision.start_pose(&choices);
    let (drive_base, truth) = {
        let db = SimDriveBase::new(&sim_params, start);
        let truth = db.pose_handle();
        (db, truth)
    };

    let robot = Robot::new(
        Box::new(drive_base),
        PidDrive::new(&pid_params()),
        Box::new(LogDashboard::new()),
    )
    .with_vision(Box::new(FixedVision(Pose2D::new(12.0, 20.0, 0.0))));

    let mut h = Harness { robot, truth, t: 0.0 };

    let mut cmd = CmdSkystoneVision::new(&choices, VisionParams::from_choices(&choices));
    cmd.start().unwrap();

    assert!(h.run(&mut cmd, 10.0));

    // Detection 12 in to the right ignored, the left stone assumed instead
    h.assert_at(-32.0, 40.0);
}

#[test]
fn test_building_zone() {
    let sim_params = sim::Params::default();

    let mut choices = AutoChoices::default();
    choices.start_delay_s = 0.5;

    let start = Routine::BuildingZone.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);

    let mut cmd = CmdAutoBuildingZone::new(&h.robot, &choices).unwrap();

    assert!(h.run(&mut cmd, 20.0));
    assert!(!cmd.is_active());

    h.assert_at(0.0, 9.0);

    // Limits throttled for the routine are restored
    assert_eq!(h.robot.pid_drive.controller(Axis::X).get_output_limit(), 1.0);
    assert_eq!(h.robot.pid_drive.controller(Axis::Y).get_output_limit(), 1.0);

    let latch = h.robot.foundation_latch.as_ref().unwrap();
    assert!(!latch.is_grabbed());
}

#[test]
fn test_building_zone_blue() {
    let sim_params = sim::Params::default();

    let mut choices = AutoChoices::default();
    choices.alliance = Alliance::Blue;

    let start = Routine::BuildingZone.start_pose(&choices);
    assert_eq!(start.x, -48.0);

    let mut h = harness(&sim_params, start, &choices);
    let mut cmd = CmdAutoBuildingZone::new(&h.robot, &choices).unwrap();

    assert!(h.run(&mut cmd, 20.0));
    h.assert_at(0.0, 9.0);
}

#[test]
fn test_building_zone_no_park() {
    let sim_params = sim::Params::default();

    let mut choices = AutoChoices::default();
    choices.park = ParkPosition::NoPark;

    let start = Routine::BuildingZone.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);
    let mut cmd = CmdAutoBuildingZone::new(&h.robot, &choices).unwrap();

    assert!(h.run(&mut cmd, 20.0));
    h.assert_at(48.0, 9.0);
}

#[test]
fn test_loading_zone() {
    let sim_params = sim::Params::default();
    let choices = AutoChoices::default();

    let start = Routine::LoadingZone.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);
    let mut cmd = CmdAutoLoadingZone::new(&h.robot, &choices).unwrap();

    assert!(h.run(&mut cmd, 60.0));
    assert!(!cmd.is_active());
    assert_eq!(cmd.stones_delivered(), 2);

    // Pushed the foundation and parked under the bridge on the center side
    h.assert_at(0.0, 36.0);

    // Still facing the building zone from the push
    assert!((h.truth.get().heading - 90.0).abs() < 3.0);

    // Loaded gain and throttled limits are restored
    let y_ctrl = h.robot.pid_drive.controller(Axis::Y);
    assert_eq!(y_ctrl.get_pid_coefficients().k_p, 0.1);
    assert_eq!(y_ctrl.get_output_limit(), 1.0);
    assert_eq!(h.robot.pid_drive.controller(Axis::X).get_output_limit(), 1.0);

    assert!(!h.robot.grabber.as_ref().unwrap().is_grabbed());
    assert!(!h.robot.foundation_latch.as_ref().unwrap().is_grabbed());
}

#[test]
fn test_loading_zone_second_skystone_not_seen() {
    // Only one skystone can be seen, the second is taken from the known
    // spacing after realigning on the wall
    let mut sim_params = sim::Params::default();
    sim_params.skystone_xs = vec![-32.0];

    let mut choices = AutoChoices::default();
    choices.move_foundation = false;
    choices.park = ParkPosition::CloseToWall;

    let start = Routine::LoadingZone.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);
    let mut cmd = CmdAutoLoadingZone::new(&h.robot, &choices).unwrap();

    assert!(h.run(&mut cmd, 60.0));
    assert_eq!(cmd.stones_delivered(), 2);

    h.assert_at(0.0, 9.0);
    assert!(!h.robot.foundation_latch.as_ref().unwrap().is_grabbed());
}

#[test]
fn test_loading_zone_needs_grabber() {
    let sim_params = sim::Params::default();
    let choices = AutoChoices::default();

    let robot = Robot::new(
        Box::new(SimDriveBase::new(&sim_params, Pose2D::default())),
        PidDrive::new(&pid_params()),
        Box::new(LogDashboard::new()),
    );

    match CmdAutoLoadingZone::new(&robot, &choices) {
        Err(CmdError::MissingEquipment(_)) => (),
        Err(e) => panic!("Unexpected error: {}", e),
        Ok(_) => panic!("Routine started without a grabber"),
    }
}

#[test]
fn test_cancel_stops_everything() {
    let sim_params = sim::Params::default();
    let choices = AutoChoices::default();

    let start = Routine::LoadingZone.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);
    let mut cmd = CmdAutoLoadingZone::new(&h.robot, &choices).unwrap();

    // Part way to the skystone line with the limits throttled
    assert!(!h.run(&mut cmd, 0.3));
    assert!(h.robot.pid_drive.is_active());
    assert_eq!(h.robot.pid_drive.controller(Axis::Y).get_output_limit(), 0.5);

    cmd.cancel(&mut h.robot);

    assert!(!cmd.is_active());
    assert!(!h.robot.pid_drive.is_active());
    assert_eq!(h.robot.pid_drive.controller(Axis::Y).get_output_limit(), 1.0);

    // Cancelling twice is harmless
    cmd.cancel(&mut h.robot);

    // Nothing moves afterwards
    let pose = h.truth.get();
    for _ in 0..50 {
        assert!(run_cycle(&mut cmd, &mut h.robot, h.t));
        h.t += CYCLE_PERIOD_S;
    }
    assert_eq!(h.truth.get(), pose);
}

#[test]
fn test_cancel_during_latch_move() {
    let sim_params = sim::Params::default();
    let choices = AutoChoices::default();

    let start = Routine::BuildingZone.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);
    let mut cmd = CmdAutoBuildingZone::new(&h.robot, &choices).unwrap();

    assert!(h.run_until_state(&mut cmd, "HookFoundation", 20.0));
    assert!(h.robot.foundation_latch.as_ref().unwrap().is_grabbed());
    assert!(!cmd.event().is_resolved());

    cmd.cancel(&mut h.robot);
    assert!(!cmd.is_active());

    // The latch move outlives its move time without signaling the routine
    h.run_robot(1.0);
    assert!(!cmd.event().is_signaled());
    assert!(!cmd.event().is_cancelled());
}

#[test]
fn test_cancel_during_grab() {
    let sim_params = sim::Params::default();
    let choices = AutoChoices::default();

    let start = Routine::LoadingZone.start_pose(&choices);
    let mut h = harness(&sim_params, start, &choices);
    let mut cmd = CmdAutoLoadingZone::new(&h.robot, &choices).unwrap();

    assert!(h.run_until_state(&mut cmd, "GrabSkystone", 20.0));
    assert!(h.robot.grabber.as_ref().unwrap().is_grabbed());

    cmd.cancel(&mut h.robot);
    assert!(!cmd.is_active());

    h.run_robot(1.0);
    assert!(!cmd.event().is_signaled());
    assert!(!cmd.event().is_cancelled());
}

/// A routine which fails on its first step.
struct FailingCmd {
    active: bool,
    cancelled: bool,
}

impl RobotCommand for FailingCmd {
    fn name(&self) -> &str {
        "FailingCmd"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn cancel(&mut self, _robot: &mut Robot) {
        self.active = false;
        self.cancelled = true;
    }

    fn periodic_step(&mut self, _robot: &mut Robot, _elapsed_s: f64) -> Result<bool, CmdError> {
        Err(CmdError::MissingEquipment("arm"))
    }

    fn state_name(&self) -> Option<String> {
        None
    }
}

#[test]
fn test_run_cycle_aborts_failing_command() {
    let sim_params = sim::Params::default();
    let choices = AutoChoices::default();
    let mut h = harness(&sim_params, Pose2D::default(), &choices);

    let mut cmd = FailingCmd {
        active: true,
        cancelled: false,
    };

    assert!(run_cycle(&mut cmd, &mut h.robot, 0.0));
    assert!(cmd.cancelled);
    assert!(!cmd.is_active());
}
