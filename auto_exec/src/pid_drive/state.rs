//! PidDrive state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::Params;
use crate::{
    eqpt::DriveBase,
    event::{DriveOutcome, Event, EventData},
    pid_ctrl::{PidController, PidInfo},
    pose::{Axes, Axis, Pose2D},
};
use util::params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Coordinated X, Y and heading PID drive.
pub struct PidDrive {
    /// Per axis controllers
    ctrls: Axes<PidController>,

    /// Per axis absolute target mode
    abs_target_mode: Axes<bool>,

    /// Absolute field target of the current (or last) move
    abs_target_pose: Pose2D,

    /// True while a move is in progress
    active: bool,

    /// If true the heading is held once a move completes
    hold_heading: bool,

    /// True while holding heading after a completed move
    holding: bool,

    /// Event signaled when the current move completes
    event: Option<Event>,

    /// Targets passed to `set_target` for the current (or last) move
    last_command: Axes<f64>,

    /// Outcome of the last completed move
    last_outcome: Option<DriveOutcome>,
}

/// Snapshot of the drive for diagnostics.
#[derive(Debug, Serialize, Clone)]
pub struct PidDriveInfo {
    pub active: bool,
    pub holding: bool,
    pub abs_target_pose: Pose2D,
    pub last_command: Axes<f64>,
    pub last_outcome: Option<DriveOutcome>,
    pub ctrls: Axes<PidInfo>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PidDriveError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("Target for the {0} axis is not finite ({1})")]
    InvalidTarget(Axis, f64),

    #[error("Pose {0} is not finite")]
    InvalidPose(Pose2D),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidDrive {
    /// Initialise the PidDrive.
    ///
    /// Expected init data is a path to the parameter file.
    pub fn init(params_path: &str) -> Result<Self, PidDriveError> {
        let params: Params = match params::load(params_path) {
            Ok(p) => p,
            Err(e) => return Err(PidDriveError::ParamLoadError(e)),
        };

        Ok(Self::new(&params))
    }

    /// Create a new drive from its parameters.
    pub fn new(params: &Params) -> Self {
        Self {
            ctrls: Axes::new(
                PidController::new("x_pid", params.x),
                PidController::new("y_pid", params.y),
                PidController::new("turn_pid", params.turn),
            ),
            abs_target_mode: params.abs_target_mode,
            abs_target_pose: Pose2D::default(),
            active: false,
            hold_heading: false,
            holding: false,
            event: None,
            last_command: Axes::default(),
            last_outcome: None,
        }
    }

    /// Start a move.
    ///
    /// Each target is passed to its axis controller: an absolute controller
    /// takes it as a setpoint, a relative controller in absolute target mode
    /// adds it to the previous absolute target, and any other relative
    /// controller adds it to the measured position.
    ///
    /// Starting a move while one is in progress replaces it. The previous
    /// move's event, if it is a different event, is cancelled.
    pub fn set_target(
        &mut self,
        db: &dyn DriveBase,
        targets: Axes<f64>,
        hold_heading: bool,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        for &axis in Axis::ALL.iter() {
            let v = *targets.get(axis);
            if !v.is_finite() {
                return Err(PidDriveError::InvalidTarget(axis, v));
            }
        }

        // Release anything waiting on a superseded move
        if let Some(prev) = self.event.take() {
            let replaced = match event {
                Some(e) => !prev.same_as(e),
                None => true,
            };
            if replaced {
                prev.cancel();
            }
        }

        for &axis in Axis::ALL.iter() {
            let value = *targets.get(axis);
            let measured = db.get_position(axis);
            let abs_mode = *self.abs_target_mode.get(axis);
            let prev_target = self.abs_target_pose.get(axis);
            let ctrl = self.ctrls.get_mut(axis);

            if !ctrl.is_absolute_setpoint() && abs_mode {
                ctrl.set_setpoint(prev_target + value);
            }
            else {
                ctrl.set_target(value, measured);
            }

            self.abs_target_pose.set(axis, ctrl.get_setpoint());
        }

        if let Some(e) = event {
            e.clear();
        }

        self.event = event.cloned();
        self.last_command = targets;
        self.last_outcome = None;
        self.hold_heading = hold_heading;
        self.holding = false;
        self.active = true;

        debug!(
            "PidDrive target {:?} at {:.2} s, absolute target {}",
            targets, now_s, self.abs_target_pose
        );

        Ok(())
    }

    /// Move by the given offsets from where the drive is, or in absolute
    /// target mode, from the previous absolute target.
    pub fn set_relative_target(
        &mut self,
        db: &dyn DriveBase,
        deltas: Axes<f64>,
        hold_heading: bool,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        let targets = deltas.map(|axis, d| self.relative_value(db, axis, *d));
        self.set_target(db, targets, hold_heading, event, now_s)
    }

    /// Move to the given field pose.
    pub fn set_absolute_target(
        &mut self,
        db: &dyn DriveBase,
        pose: Pose2D,
        hold_heading: bool,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        let targets = Axes::from(pose)
            .map(|axis, t| self.absolute_value(db, axis, *t));
        self.set_target(db, targets, hold_heading, event, now_s)
    }

    pub fn set_relative_x_target(
        &mut self,
        db: &dyn DriveBase,
        dx: f64,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        self.set_relative_target(db, Axes::new(dx, 0.0, 0.0), false, event, now_s)
    }

    pub fn set_relative_y_target(
        &mut self,
        db: &dyn DriveBase,
        dy: f64,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        self.set_relative_target(db, Axes::new(0.0, dy, 0.0), false, event, now_s)
    }

    pub fn set_relative_turn_target(
        &mut self,
        db: &dyn DriveBase,
        dturn: f64,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        self.set_relative_target(db, Axes::new(0.0, 0.0, dturn), false, event, now_s)
    }

    pub fn set_absolute_x_target(
        &mut self,
        db: &dyn DriveBase,
        x: f64,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        self.set_single_absolute_target(db, Axis::X, x, event, now_s)
    }

    pub fn set_absolute_y_target(
        &mut self,
        db: &dyn DriveBase,
        y: f64,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        self.set_single_absolute_target(db, Axis::Y, y, event, now_s)
    }

    pub fn set_absolute_heading_target(
        &mut self,
        db: &dyn DriveBase,
        heading: f64,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        self.set_single_absolute_target(db, Axis::Turn, heading, event, now_s)
    }

    /// Run one control cycle.
    ///
    /// Returns the outcome on the cycle the move finishes. The completion
    /// event is signaled on that cycle and never again for the same move.
    pub fn update(
        &mut self,
        db: &mut dyn DriveBase,
        now_s: f64,
    ) -> Option<DriveOutcome> {
        if self.holding {
            let turn = self.ctrls.turn.compute(db.get_heading(), now_s);
            db.holonomic_drive(0.0, 0.0, turn);
            return None;
        }

        if !self.active {
            return None;
        }

        let mut outputs: Axes<f64> = Axes::default();
        for &axis in Axis::ALL.iter() {
            let measured = db.get_position(axis);
            *outputs.get_mut(axis) = self.ctrls.get_mut(axis).compute(measured, now_s);
        }

        let stalled_axis = Axis::ALL
            .iter()
            .copied()
            .find(|a| self.ctrls.get(*a).is_stalled());

        let outcome = match stalled_axis {
            Some(axis) => Some(DriveOutcome::Stalled { axis }),
            None if Axis::ALL.iter().all(|a| self.ctrls.get(*a).is_on_target()) => {
                Some(DriveOutcome::OnTarget)
            }
            None => None,
        };

        match outcome {
            Some(outcome) => {
                self.finish(db, outcome);
                Some(outcome)
            }
            None => {
                db.holonomic_drive(outputs.x, outputs.y, outputs.turn);
                None
            }
        }
    }

    /// Stop the drive immediately.
    ///
    /// The drive output is zeroed, saved output limits are restored and the
    /// completion event is marked cancelled rather than signaled. Cancelling
    /// an idle drive only restores the output limits.
    pub fn cancel(&mut self, db: &mut dyn DriveBase) {
        if self.active || self.holding {
            info!("PidDrive cancelled, absolute target {}", self.abs_target_pose);
            db.stop();
        }

        self.active = false;
        self.holding = false;

        for &axis in Axis::ALL.iter() {
            let ctrl = self.ctrls.get_mut(axis);
            ctrl.restore_output_limit();
            ctrl.reset();
        }

        if let Some(event) = self.event.take() {
            event.cancel();
        }
    }

    /// True while a move is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True while holding heading after a completed move.
    pub fn is_holding(&self) -> bool {
        self.holding
    }

    /// Rebase the odometry and the absolute target pose to `pose`.
    ///
    /// Used to correct odometry, for example after wheel slip against a wall,
    /// without restarting the routine.
    pub fn set_absolute_pose(
        &mut self,
        db: &mut dyn DriveBase,
        pose: Pose2D,
    ) -> Result<(), PidDriveError> {
        if !pose.is_finite() {
            return Err(PidDriveError::InvalidPose(pose));
        }

        if self.active {
            warn!("PidDrive pose rebased to {} during a move", pose);
        }
        else {
            debug!("PidDrive pose rebased to {}", pose);
        }

        db.set_field_position(pose);
        self.abs_target_pose = pose;

        Ok(())
    }

    pub fn get_absolute_target_pose(&self) -> Pose2D {
        self.abs_target_pose
    }

    /// Set the absolute target pose without touching the odometry.
    pub fn set_absolute_target_pose(
        &mut self,
        pose: Pose2D,
    ) -> Result<(), PidDriveError> {
        if !pose.is_finite() {
            return Err(PidDriveError::InvalidPose(pose));
        }

        self.abs_target_pose = pose;
        Ok(())
    }

    pub fn set_abs_target_mode(&mut self, mode: Axes<bool>) {
        self.abs_target_mode = mode;
    }

    pub fn get_abs_target_mode(&self) -> Axes<bool> {
        self.abs_target_mode
    }

    /// Set the stall timeout of every axis, zero disables stall detection.
    pub fn set_stall_timeout(&mut self, timeout_s: f64) {
        for &axis in Axis::ALL.iter() {
            self.ctrls.get_mut(axis).set_stall_timeout(timeout_s);
        }
    }

    pub fn set_no_oscillation(&mut self, enabled: bool) {
        for &axis in Axis::ALL.iter() {
            self.ctrls.get_mut(axis).set_no_oscillation(enabled);
        }
    }

    /// Temporarily limit the output of every axis.
    pub fn save_and_set_output_limit(&mut self, limit: f64) {
        for &axis in Axis::ALL.iter() {
            self.ctrls.get_mut(axis).save_and_set_output_limit(limit);
        }
    }

    /// Restore the output limits saved by `save_and_set_output_limit`.
    pub fn restore_output_limit(&mut self) {
        for &axis in Axis::ALL.iter() {
            self.ctrls.get_mut(axis).restore_output_limit();
        }
    }

    pub fn controller(&self, axis: Axis) -> &PidController {
        self.ctrls.get(axis)
    }

    pub fn controller_mut(&mut self, axis: Axis) -> &mut PidController {
        self.ctrls.get_mut(axis)
    }

    pub fn last_command(&self) -> Axes<f64> {
        self.last_command
    }

    pub fn last_outcome(&self) -> Option<DriveOutcome> {
        self.last_outcome
    }

    pub fn get_info(&self) -> PidDriveInfo {
        PidDriveInfo {
            active: self.active,
            holding: self.holding,
            abs_target_pose: self.abs_target_pose,
            last_command: self.last_command,
            last_outcome: self.last_outcome,
            ctrls: self.ctrls.map(|_, c| c.get_info()),
        }
    }

    fn finish(&mut self, db: &mut dyn DriveBase, outcome: DriveOutcome) {
        match outcome {
            DriveOutcome::OnTarget => info!(
                "PidDrive on target at {}",
                db.get_field_position()
            ),
            DriveOutcome::Stalled { axis } => warn!(
                "PidDrive stalled on {} axis at {}, target {}",
                axis,
                db.get_field_position(),
                self.abs_target_pose
            ),
        }

        self.active = false;
        self.last_outcome = Some(outcome);

        if self.hold_heading {
            self.holding = true;
            self.ctrls.turn.reset();
        }

        db.stop();

        if let Some(event) = self.event.take() {
            event.set(Some(EventData::Drive(outcome)));
        }
    }

    /// The value to pass to `set_target` to move `delta` along `axis`.
    fn relative_value(&self, db: &dyn DriveBase, axis: Axis, delta: f64) -> f64 {
        if self.ctrls.get(axis).is_absolute_setpoint() {
            self.reference(db, axis) + delta
        }
        else {
            delta
        }
    }

    /// The value to pass to `set_target` to move to `target` along `axis`.
    fn absolute_value(&self, db: &dyn DriveBase, axis: Axis, target: f64) -> f64 {
        if self.ctrls.get(axis).is_absolute_setpoint() {
            target
        }
        else {
            target - self.reference(db, axis)
        }
    }

    /// The position relative targets are measured from on `axis`.
    fn reference(&self, db: &dyn DriveBase, axis: Axis) -> f64 {
        if *self.abs_target_mode.get(axis) {
            self.abs_target_pose.get(axis)
        }
        else {
            db.get_position(axis)
        }
    }

    fn set_single_absolute_target(
        &mut self,
        db: &dyn DriveBase,
        axis: Axis,
        target: f64,
        event: Option<&Event>,
        now_s: f64,
    ) -> Result<(), PidDriveError> {
        let targets = Axes::new(0.0, 0.0, 0.0).map(|a, _| {
            if a == axis {
                self.absolute_value(db, a, target)
            }
            else {
                self.relative_value(db, a, 0.0)
            }
        });

        self.set_target(db, targets, false, event, now_s)
    }
}
