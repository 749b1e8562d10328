//! # Pose and axis types
//!
//! The holonomic drive is decomposed into three independent axes: field X,
//! field Y and heading. Positions are in inches and heading is in degrees.
//! Heading is continuous, i.e. it is not wrapped into `[0, 360)`, matching the
//! way an integrating gyro reports it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::Display;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position and heading on the field.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in inches
    pub x: f64,

    /// Y position in inches
    pub y: f64,

    /// Heading in degrees
    pub heading: f64,
}

/// One value per drive axis.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes<T> {
    pub x: T,
    pub y: T,
    pub turn: T,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The independent motion axes of a holonomic drive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Turn,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2D {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    /// Get the component of the pose along the given axis.
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Turn => self.heading,
        }
    }

    /// Set the component of the pose along the given axis.
    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Turn => self.heading = value,
        }
    }

    /// True if every component of the pose is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.heading.is_finite()
    }
}

impl From<Axes<f64>> for Pose2D {
    fn from(a: Axes<f64>) -> Self {
        Pose2D::new(a.x, a.y, a.turn)
    }
}

impl From<Pose2D> for Axes<f64> {
    fn from(p: Pose2D) -> Self {
        Axes::new(p.x, p.y, p.heading)
    }
}

impl Display for Pose2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(x={:.1}, y={:.1}, heading={:.1})",
            self.x, self.y, self.heading
        )
    }
}

impl<T> Axes<T> {
    pub fn new(x: T, y: T, turn: T) -> Self {
        Self { x, y, turn }
    }

    pub fn get(&self, axis: Axis) -> &T {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Turn => &self.turn,
        }
    }

    pub fn get_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Turn => &mut self.turn,
        }
    }

    /// Apply `f` to every axis, producing a new set of values.
    pub fn map<U, F>(&self, mut f: F) -> Axes<U>
    where
        F: FnMut(Axis, &T) -> U,
    {
        Axes {
            x: f(Axis::X, &self.x),
            y: f(Axis::Y, &self.y),
            turn: f(Axis::Turn, &self.turn),
        }
    }
}

impl Axis {
    /// All axes in the order they are processed by the drive.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Turn];
}

impl Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Turn => write!(f, "Turn"),
        }
    }
}
