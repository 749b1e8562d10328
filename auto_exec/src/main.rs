//! Autonomous routine executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session and logging
//!     - Load the parameters and build the (simulated) robot
//!     - Build and start the selected routine
//!     - Main loop, once per control cycle:
//!         - Routine processing: timers, triggers and the state action
//!         - Robot processing: drive base, actuators and the PID drive
//!     - Save the run summary into the session directory
//!
//! The loop runs on simulated time by default, which is as fast as the host
//! allows, or in real time with `--real-time`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::Serialize;
use std::{
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use auto_lib::{
    cmds::{Alliance, AutoChoices, Routine},
    pid_drive::{PidDrive, PidDriveInfo},
    pose::Pose2D,
    robot_cmd::run_cycle,
    sim,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Run an autonomous routine on the simulated robot.
#[derive(Debug, StructOpt)]
#[structopt(name = "auto_exec")]
struct Opt {
    /// Routine to run: building_zone, loading_zone or skystone_vision
    #[structopt(default_value = "loading_zone")]
    routine: Routine,

    /// PID drive parameters file, relative to the params directory
    #[structopt(long, default_value = "pid_drive.toml")]
    pid_drive_params: String,

    /// Routine choices file, relative to the params directory
    #[structopt(long, default_value = "auto.toml")]
    auto_params: String,

    /// Simulation parameters file, relative to the params directory
    #[structopt(long, default_value = "sim.toml")]
    sim_params: String,

    /// Override the alliance in the routine choices
    #[structopt(short, long)]
    alliance: Option<Alliance>,

    /// Override the start delay in the routine choices
    #[structopt(long)]
    start_delay_s: Option<f64>,

    /// Control cycle period
    #[structopt(long, default_value = "0.02")]
    cycle_period_s: f64,

    /// Routine time limit, the routine is cancelled when it runs out
    #[structopt(long, default_value = "30.0")]
    max_run_time_s: f64,

    /// Pace the loop in real time rather than stepping simulated time
    #[structopt(long)]
    real_time: bool,

    /// Sessions directory, relative to the software root
    #[structopt(long, default_value = "sessions")]
    sessions_dir: String,
}

/// Summary of a run, saved into the session directory.
#[derive(Debug, Serialize)]
struct RunSummary {
    routine: Routine,
    alliance: Alliance,

    /// False if the routine was cancelled at the time limit
    finished: bool,
    run_time_s: f64,
    num_cycles: u64,
    start_pose: Pose2D,
    final_pose: Pose2D,
    true_pose: Pose2D,
    abs_target_pose: Pose2D,
    state_trace: Vec<StateChange>,
    pid_drive: PidDriveInfo,
}

#[derive(Debug, Serialize)]
struct StateChange {
    time_s: f64,
    state: Option<String>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("auto_exec", &opt.sessions_dir)
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &[], &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Autonomous Routine Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    info!("Options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let mut choices: AutoChoices = util::params::load(&opt.auto_params)
        .wrap_err("Could not load the routine choices")?;

    if let Some(alliance) = opt.alliance {
        choices.alliance = alliance;
    }
    if let Some(delay) = opt.start_delay_s {
        choices.start_delay_s = delay;
    }

    let sim_params: sim::Params = util::params::load(&opt.sim_params)
        .wrap_err("Could not load the simulation parameters")?;

    let pid_drive = PidDrive::init(&opt.pid_drive_params)
        .wrap_err("Failed to initialise the PidDrive")?;

    info!("Parameters loaded");

    // ---- INITIALISE ROBOT AND ROUTINE ----

    let start_pose = opt.routine.start_pose(&choices);
    let (mut robot, true_pose) = sim::build_robot(
        &sim_params,
        pid_drive,
        start_pose,
        choices.alliance.direction(),
    );

    let mut cmd = opt
        .routine
        .build(&robot, &choices)
        .wrap_err("Failed to start the routine")?;

    info!(
        "Running {:?} for the {:?} alliance from {}\n",
        opt.routine, choices.alliance, start_pose
    );

    // ---- MAIN LOOP ----

    let start_s = session::get_elapsed_seconds();
    let mut sim_time_s = 0.0;
    let mut num_cycles = 0u64;
    let mut finished = false;
    let mut state_trace: Vec<StateChange> = Vec::new();

    loop {
        let cycle_start_instant = Instant::now();

        let now_s = if opt.real_time {
            session::get_elapsed_seconds() - start_s
        }
        else {
            sim_time_s
        };

        if now_s > opt.max_run_time_s {
            warn!("Routine time limit of {} s reached, cancelling", opt.max_run_time_s);
            cmd.cancel(&mut robot);
            break;
        }

        if run_cycle(cmd.as_mut(), &mut robot, now_s) {
            finished = true;
            info!("Routine finished after {:.2} s", now_s);
            break;
        }

        let state = cmd.state_name();
        if state_trace.last().map(|s| &s.state) != Some(&state) {
            state_trace.push(StateChange {
                time_s: now_s,
                state,
            });
        }

        num_cycles += 1;
        sim_time_s += opt.cycle_period_s;

        if opt.real_time {
            let period = Duration::from_secs_f64(opt.cycle_period_s);
            match period.checked_sub(cycle_start_instant.elapsed()) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_start_instant.elapsed().as_secs_f64() - opt.cycle_period_s
                ),
            }
        }
    }

    robot.stop();

    // ---- SAVE SUMMARY ----

    let run_time_s = if opt.real_time {
        session::get_elapsed_seconds() - start_s
    }
    else {
        sim_time_s
    };

    let summary = RunSummary {
        routine: opt.routine,
        alliance: choices.alliance,
        finished,
        run_time_s,
        num_cycles,
        start_pose,
        final_pose: robot.drive_base.get_field_position(),
        true_pose: true_pose.get(),
        abs_target_pose: robot.pid_drive.get_absolute_target_pose(),
        state_trace,
        pid_drive: robot.pid_drive.get_info(),
    };

    info!(
        "Final pose {}, true pose {}, absolute target {}",
        summary.final_pose, summary.true_pose, summary.abs_target_pose
    );

    session
        .save_json("run_summary.json", &summary)
        .wrap_err("Failed to save the run summary")?;

    Ok(())
}
