//! PID controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains of a PID controller.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct PidCoefficients {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    #[serde(default)]
    pub k_i: f64,

    /// Derivative gain
    #[serde(default)]
    pub k_d: f64,
}

/// Parameters for one axis controller.
///
/// Tolerances, settling and stall constants are tuned per robot so all of them
/// are configuration.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq)]
pub struct PidParams {
    /// Controller gains
    pub coeffs: PidCoefficients,

    /// Error magnitude below which the axis is considered on target
    pub tolerance: f64,

    /// Magnitude limit of the controller output
    #[serde(default = "default_output_limit")]
    pub output_limit: f64,

    /// Time the error must stay inside the tolerance before the axis is on
    /// target. Zero reports on target on the first cycle inside tolerance.
    #[serde(default)]
    pub settling_time_s: f64,

    /// If true the error must not change sign after entering the tolerance
    /// band for the axis to be on target.
    #[serde(default)]
    pub no_oscillation: bool,

    /// If true targets passed to the controller are absolute setpoints,
    /// otherwise they are relative to the measurement when the target is set.
    #[serde(default)]
    pub absolute_setpoint: bool,

    /// If true the derivative is taken on the measurement rather than the
    /// error, which avoids a derivative kick when the target changes.
    #[serde(default)]
    pub derivative_on_measurement: bool,

    /// Time the output must be saturated without progress for the axis to be
    /// stalled. Zero disables stall detection.
    #[serde(default)]
    pub stall_timeout_s: f64,

    /// Change in measurement below which the axis is considered not moving
    #[serde(default = "default_stall_noise_threshold")]
    pub stall_noise_threshold: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidCoefficients {
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self { k_p, k_i, k_d }
    }
}

impl PidParams {
    /// Parameters with the given gains and tolerance, everything else default.
    pub fn new(coeffs: PidCoefficients, tolerance: f64) -> Self {
        Self {
            coeffs,
            tolerance,
            output_limit: default_output_limit(),
            settling_time_s: 0.0,
            no_oscillation: false,
            absolute_setpoint: false,
            derivative_on_measurement: false,
            stall_timeout_s: 0.0,
            stall_noise_threshold: default_stall_noise_threshold(),
        }
    }
}

fn default_output_limit() -> f64 {
    1.0
}

fn default_stall_noise_threshold() -> f64 {
    0.1
}
