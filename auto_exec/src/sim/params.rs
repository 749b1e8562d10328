//! Simulation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulated robot and field.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Params {
    /// Drive speed at full power
    pub max_speed_ips: f64,

    /// Turn rate at full power
    pub max_turn_rate_dps: f64,

    /// Limits of the robot centre, set by the field walls
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,

    /// Time for the stone grabber to open or close
    pub grabber_time_s: f64,

    /// Time for the foundation latch to open or close
    pub latch_time_s: f64,

    /// Red alliance X of the skystone centres
    pub skystone_xs: Vec<f64>,

    /// Y of the stone centres
    pub stone_y: f64,

    /// Half width of the camera view at the stones
    pub fov_half_width_in: f64,

    /// Maximum detection range
    pub max_range_in: f64,

    /// Number of polls which return nothing before vision starts detecting
    #[serde(default)]
    pub initial_misses: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            max_speed_ips: 40.0,
            max_turn_rate_dps: 180.0,
            min_x: -63.0,
            max_x: 63.0,
            min_y: 9.0,
            max_y: 135.0,
            grabber_time_s: 0.5,
            latch_time_s: 0.5,
            skystone_xs: vec![-32.0, -56.0],
            stone_y: 48.0,
            fov_half_width_in: 5.0,
            max_range_in: 36.0,
            initial_misses: 0,
        }
    }
}
