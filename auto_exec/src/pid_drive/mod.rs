//! # PID drive module
//!
//! The PidDrive coordinates three [`PidController`](crate::pid_ctrl::PidController)s,
//! one each for field X, field Y and heading, into a single holonomic drive
//! command.
//!
//! A move is started with one of the target functions, after which
//! [`PidDrive::update`] must be called every cycle. The move completes when
//! every axis is on target, or terminates as soon as any axis stalls. In both
//! cases the completion event is signaled exactly once, with a
//! [`DriveOutcome`](crate::event::DriveOutcome) payload so the caller can
//! decide what a stall means for it. A cancelled move does not signal its
//! event, it is marked cancelled instead.
//!
//! Each axis controller is either absolute (its setpoint is a field position)
//! or relative (its target is an offset from the measured position when the
//! target is set). Independently each axis may be put into absolute target
//! mode, where relative targets accumulate onto the previous absolute target
//! rather than onto the measured position, so that the tolerance left over at
//! the end of one move is not carried into the next.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use state::*;
