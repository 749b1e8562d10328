//! # PID control module
//!
//! Provides the single axis [`PidController`] used by the PidDrive for each of
//! the X, Y and heading axes. Each controller produces an output bounded by its
//! output limit and reports whether its axis is on target or stalled.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controller;
pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controller::*;
pub use params::*;
