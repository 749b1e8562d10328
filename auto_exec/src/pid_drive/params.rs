//! PidDrive parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::{pid_ctrl::PidParams, pose::Axes};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the PidDrive
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Params {
    /// X axis controller
    pub x: PidParams,

    /// Y axis controller
    pub y: PidParams,

    /// Heading controller
    pub turn: PidParams,

    /// Per axis absolute target mode. In this mode relative targets accumulate
    /// onto the previous absolute target rather than the measured position.
    #[serde(default)]
    pub abs_target_mode: Axes<bool>,
}
