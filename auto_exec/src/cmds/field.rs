//! Field positions used by the routines.
//!
//! All positions are for the red alliance, in inches. The origin is the centre
//! of the alliance wall, X runs along the wall towards the building zone and Y
//! runs away from the wall. Blue positions are found by multiplying X by
//! [`Alliance::direction`](super::params::Alliance::direction).

/// Y of the robot centre when it is against the alliance wall
pub const ROBOT_START_Y: f64 = 9.0;

/// X of the robot centre when it is against the loading zone wall
pub const WALL_X: f64 = -63.0;

pub const LOADING_ZONE_START_X: f64 = -36.0;
pub const BUILDING_ZONE_START_X: f64 = 48.0;

/// Distance between neighbouring stone centres
pub const STONE_PITCH: f64 = 8.0;

/// Stones nearest the bridge, in the set furthest from the wall
pub const FAR_STONE1_X: f64 = -24.0;
pub const FAR_STONE3_X: f64 = -40.0;

/// The stone touching the wall can't be grabbed, this is the last one that can
pub const LAST_REACHABLE_STONE_X: f64 = -56.0;

/// Distance between the two skystones
pub const SKYSTONE_SPACING: f64 = 24.0;

/// Y of the stone centres
pub const STONE_Y: f64 = 48.0;

/// Y the robot must be at to grab a stone
pub const GRAB_SKYSTONE_Y: f64 = 40.0;

/// Distance to move from the wall to get the stones into vision range
pub const SKYSTONE_LINE_DISTANCE: f64 = 20.0;

/// Strafe distance when scanning across a set of stones
pub const SKYSTONE_SCAN_DISTANCE: f64 = 24.0;

/// Vision detections further than this to the side are rejected
pub const MAX_SKYSTONE_OFFSET: f64 = 8.0;

pub const PULL_STONE_DISTANCE: f64 = 8.0;
pub const FOUNDATION_APPROACH_DISTANCE: f64 = 11.0;
pub const FOUNDATION_DROP_FAR_X: f64 = 48.0;
pub const FOUNDATION_DROP_NEAR_X: f64 = 40.0;

/// Deliberately further than the wall so the robot is sure to reach it
pub const PULL_FOUNDATION_DISTANCE: f64 = 43.0;
pub const PUSH_FOUNDATION_DISTANCE: f64 = 16.0;

/// Heading which faces the building zone, to push the foundation into the
/// corner
pub const FACE_FOUNDATION_HEADING: f64 = 90.0;

/// Distance from the building zone wall to the foundation
pub const FOUNDATION_BACKUP_DISTANCE: f64 = 30.0;

/// Strafe from the building zone start to the line under the bridge
pub const LINE_SCOOT_DISTANCE: f64 = 48.0;

pub const NEXT_TO_PARTNER_PARK_X: f64 = 24.0;
pub const UNDER_BRIDGE_PARK_X: f64 = 0.0;
pub const CENTER_BRIDGE_PARK_Y: f64 = 36.0;
