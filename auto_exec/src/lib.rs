//! # Autonomous command library.
//!
//! This library allows the executable, the tests and the benchmarks to access
//! the command engine and the routines built on it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Absolute target drive - turns sequential relative moves into drift free absolute targets
pub mod abs_target_drive;

/// Autonomous routines
pub mod cmds;

/// Equipment interfaces - drive base, grabbers, vision and dashboard
pub mod eqpt;

/// Events - completion signalling between operations and state machines
pub mod event;

/// Single axis PID controller
pub mod pid_ctrl;

/// PID drive - coordinated X, Y and turn control of the drive base
pub mod pid_drive;

/// Field poses and per axis values
pub mod pose;

/// The robot's equipment, passed explicitly to every command
pub mod robot;

/// Robot command interface and the control cycle runner
pub mod robot_cmd;

/// Simulated equipment
pub mod sim;

/// Generic cooperative state machine
pub mod state_machine;

/// Timers which signal an event at a deadline
pub mod timer;

/// Edge triggered sensor triggers
pub mod trigger;
