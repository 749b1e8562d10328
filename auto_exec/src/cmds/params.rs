//! Autonomous routine choices

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Choices made before a match for the autonomous routines.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AutoChoices {
    pub alliance: Alliance,

    /// Delay before the routine starts moving
    #[serde(default)]
    pub start_delay_s: f64,

    /// Delay before pulling the foundation, leaving time for a partner robot
    #[serde(default)]
    pub finish_delay_s: f64,

    #[serde(default = "default_true")]
    pub move_foundation: bool,

    #[serde(default)]
    pub park: ParkPosition,

    /// Scan across the stones with a vision trigger instead of polling vision
    /// in front of each stone
    #[serde(default)]
    pub use_vision_trigger: bool,

    /// Time to wait for vision to detect a stone before moving on
    #[serde(default = "default_vision_timeout_s")]
    pub vision_timeout_s: f64,

    /// Number of times to move to the next stone when vision finds nothing
    #[serde(default = "default_scoot_count")]
    pub scoot_count: u32,

    /// If vision finds nothing assume the stone to the left is the skystone
    #[serde(default)]
    pub assume_left_if_not_found: bool,

    /// Offset of the grabber from the camera in the robot frame
    #[serde(default)]
    pub grabber_offset_x: f64,

    #[serde(default)]
    pub grabber_offset_y: f64,

    /// Drive output limit used for the slow phases of a routine
    #[serde(default = "default_slow_output_limit")]
    pub slow_output_limit: f64,

    /// Y proportional gain used while dragging the foundation
    #[serde(default = "default_loaded_y_k_p")]
    pub loaded_y_k_p: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Alliance {
    Red,
    Blue,
}

#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParkPosition {
    NoPark,
    CloseToWall,
    CloseToCenter,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown alliance \"{0}\", expected red or blue")]
pub struct ParseAllianceError(String);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Alliance {
    /// Sign applied to field X targets, the blue field is the red field
    /// mirrored in X.
    pub fn direction(&self) -> f64 {
        match self {
            Alliance::Red => 1.0,
            Alliance::Blue => -1.0,
        }
    }
}

impl FromStr for Alliance {
    type Err = ParseAllianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "red" => Ok(Alliance::Red),
            "blue" => Ok(Alliance::Blue),
            _ => Err(ParseAllianceError(s.to_string())),
        }
    }
}

impl Default for ParkPosition {
    fn default() -> Self {
        ParkPosition::CloseToCenter
    }
}

impl Default for AutoChoices {
    fn default() -> Self {
        Self {
            alliance: Alliance::Red,
            start_delay_s: 0.0,
            finish_delay_s: 0.0,
            move_foundation: true,
            park: ParkPosition::default(),
            use_vision_trigger: false,
            vision_timeout_s: default_vision_timeout_s(),
            scoot_count: default_scoot_count(),
            assume_left_if_not_found: false,
            grabber_offset_x: 0.0,
            grabber_offset_y: 0.0,
            slow_output_limit: default_slow_output_limit(),
            loaded_y_k_p: default_loaded_y_k_p(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_vision_timeout_s() -> f64 {
    1.0
}

fn default_scoot_count() -> u32 {
    2
}

fn default_slow_output_limit() -> f64 {
    0.5
}

fn default_loaded_y_k_p() -> f64 {
    0.3
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_choices() {
        let choices: AutoChoices = util::params::parse(
            r#"
            alliance = "Blue"
            start_delay_s = 2.5
            park = "NoPark"
            "#,
        )
        .unwrap();

        assert_eq!(choices.alliance, Alliance::Blue);
        assert_eq!(choices.alliance.direction(), -1.0);
        assert_eq!(choices.start_delay_s, 2.5);
        assert_eq!(choices.park, ParkPosition::NoPark);
        assert!(choices.move_foundation);
        assert_eq!(choices.scoot_count, 2);

        assert_eq!("RED".parse::<Alliance>().unwrap(), Alliance::Red);
        assert!("green".parse::<Alliance>().is_err());
    }
}
