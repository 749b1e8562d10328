//! # PID controller
//!
//! A single axis closed-loop controller. Targets are held internally as
//! absolute setpoints, a relative target is converted using the measurement at
//! the time it is set.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{PidCoefficients, PidParams};
use util::maths::abs_cap;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Name used in log output
    name: String,

    /// Current parameters, including any temporary overrides
    params: PidParams,

    /// Output limit saved by `save_and_set_output_limit`
    saved_output_limit: Option<f64>,

    /// The absolute setpoint
    setpoint: f64,

    /// Previous time that `compute` was called
    prev_time_s: Option<f64>,

    /// Previous error
    prev_error: Option<f64>,

    /// Previous measurement
    prev_measured: Option<f64>,

    /// The integral accumulation
    integral: f64,

    /// Values from the last call to `compute`
    last_measured: f64,
    last_error: f64,
    last_output: f64,

    /// Time the error entered the tolerance band
    in_tolerance_since_s: Option<f64>,

    /// Sign of the error when it entered the tolerance band
    entry_error_sign: f64,

    /// Set if the error has changed sign since entering the tolerance band
    oscillated: bool,

    on_target: bool,

    /// Measurement and time at which the output saturated
    stall_ref: Option<(f64, f64)>,

    stalled: bool,
}

/// Snapshot of a controller, for logging and diagnostics.
#[derive(Debug, Serialize, Copy, Clone, PartialEq)]
pub struct PidInfo {
    pub setpoint: f64,
    pub measured: f64,
    pub error: f64,
    pub integral: f64,
    pub output: f64,
    pub output_limit: f64,
    pub on_target: bool,
    pub stalled: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller from its parameters.
    pub fn new(name: &str, params: PidParams) -> Self {
        let mut params = params;
        params.output_limit = params.output_limit.abs();
        params.tolerance = params.tolerance.abs();

        Self {
            name: name.to_string(),
            params,
            saved_output_limit: None,
            setpoint: 0.0,
            prev_time_s: None,
            prev_error: None,
            prev_measured: None,
            integral: 0.0,
            last_measured: 0.0,
            last_error: 0.0,
            last_output: 0.0,
            in_tolerance_since_s: None,
            entry_error_sign: 0.0,
            oscillated: false,
            on_target: false,
            stall_ref: None,
            stalled: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &PidParams {
        &self.params
    }

    /// Set the target of the controller.
    ///
    /// If the controller uses absolute setpoints `value` is the setpoint,
    /// otherwise the setpoint is `measured + value`. The integral is reset.
    pub fn set_target(&mut self, value: f64, measured: f64) {
        let setpoint = if self.params.absolute_setpoint {
            value
        }
        else {
            measured + value
        };

        self.set_setpoint(setpoint);
    }

    /// Set the absolute setpoint directly, resetting the integral.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        trace!("{}: setpoint {:.3} -> {:.3}", self.name, self.setpoint, setpoint);
        self.setpoint = setpoint;
        self.reset_dynamics();
    }

    pub fn get_setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Compute the controller output for the given measurement.
    ///
    /// This function is time-aware, `now_s` is the current session time. On
    /// the first call after a reset or target change there is no time
    /// difference so the integral and derivative terms are not used.
    ///
    /// The output is always within `[-output_limit, output_limit]`.
    pub fn compute(&mut self, measured: f64, now_s: f64) -> f64 {
        let error = self.setpoint - measured;

        // Calculate dt, ignoring non-increasing time
        let dt = match self.prev_time_s {
            Some(t0) if now_s > t0 => Some(now_s - t0),
            _ => None,
        };

        // Accumulate the integral, clamped so that the integral term alone
        // can't exceed the output limit
        if let Some(t) = dt {
            self.integral += error * t;

            if self.params.coeffs.k_i != 0.0 {
                self.integral = abs_cap(
                    self.integral,
                    self.params.output_limit / self.params.coeffs.k_i.abs(),
                );
            }
        }

        let deriv = match dt {
            Some(t) if self.params.derivative_on_measurement => {
                match self.prev_measured {
                    Some(m) => -(measured - m) / t,
                    None => 0.0,
                }
            }
            Some(t) => match self.prev_error {
                Some(e) => (error - e) / t,
                None => 0.0,
            },
            None => 0.0,
        };

        let raw = self.params.coeffs.k_p * error
            + self.params.coeffs.k_i * self.integral
            + self.params.coeffs.k_d * deriv;

        let output = abs_cap(raw, self.params.output_limit);

        self.update_on_target(error, now_s);
        self.update_stall(measured, raw, now_s);

        self.prev_error = Some(error);
        self.prev_measured = Some(measured);
        self.prev_time_s = Some(now_s);
        self.last_measured = measured;
        self.last_error = error;
        self.last_output = output;

        trace!("{}: {:?}", self.name, self.get_info());

        output
    }

    /// True if the error has stayed within tolerance for the settling time.
    ///
    /// In no-oscillation mode the error must also not have changed sign since
    /// it entered the tolerance band.
    pub fn is_on_target(&self) -> bool {
        self.on_target
    }

    /// True if the output has been saturated without the measurement moving
    /// for the stall timeout.
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// The error from the last call to `compute`.
    pub fn get_error(&self) -> f64 {
        self.last_error
    }

    pub fn get_output(&self) -> f64 {
        self.last_output
    }

    pub fn get_output_limit(&self) -> f64 {
        self.params.output_limit
    }

    pub fn set_output_limit(&mut self, limit: f64) {
        self.params.output_limit = limit.abs();
    }

    /// Set a temporary output limit, saving the current one.
    ///
    /// Only the first saved limit is kept, so nested calls restore to the
    /// original limit. Returns the previous limit.
    pub fn save_and_set_output_limit(&mut self, limit: f64) -> f64 {
        let prev = self.params.output_limit;

        if self.saved_output_limit.is_none() {
            self.saved_output_limit = Some(prev);
        }

        self.set_output_limit(limit);
        prev
    }

    /// Restore the output limit saved by `save_and_set_output_limit`.
    ///
    /// Returns the restored limit, or `None` if nothing was saved.
    pub fn restore_output_limit(&mut self) -> Option<f64> {
        let saved = self.saved_output_limit.take();

        if let Some(limit) = saved {
            self.params.output_limit = limit;
        }

        saved
    }

    pub fn get_pid_coefficients(&self) -> PidCoefficients {
        self.params.coeffs
    }

    pub fn set_pid_coefficients(&mut self, coeffs: PidCoefficients) {
        self.params.coeffs = coeffs;
    }

    pub fn set_no_oscillation(&mut self, enabled: bool) {
        self.params.no_oscillation = enabled;
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.params.tolerance = tolerance.abs();
    }

    pub fn set_stall_timeout(&mut self, timeout_s: f64) {
        self.params.stall_timeout_s = timeout_s.max(0.0);
    }

    pub fn is_absolute_setpoint(&self) -> bool {
        self.params.absolute_setpoint
    }

    /// Reset the controller dynamics and outputs, keeping the setpoint.
    pub fn reset(&mut self) {
        self.reset_dynamics();
        self.last_error = 0.0;
        self.last_output = 0.0;
    }

    pub fn get_info(&self) -> PidInfo {
        PidInfo {
            setpoint: self.setpoint,
            measured: self.last_measured,
            error: self.last_error,
            integral: self.integral,
            output: self.last_output,
            output_limit: self.params.output_limit,
            on_target: self.on_target,
            stalled: self.stalled,
        }
    }

    fn reset_dynamics(&mut self) {
        self.integral = 0.0;
        self.prev_time_s = None;
        self.prev_error = None;
        self.prev_measured = None;
        self.in_tolerance_since_s = None;
        self.entry_error_sign = 0.0;
        self.oscillated = false;
        self.on_target = false;
        self.stall_ref = None;
        self.stalled = false;
    }

    fn update_on_target(&mut self, error: f64, now_s: f64) {
        if error.abs() <= self.params.tolerance {
            let sign = sign_of(error);

            match self.in_tolerance_since_s {
                None => {
                    self.in_tolerance_since_s = Some(now_s);
                    self.entry_error_sign = sign;
                }
                Some(_) => {
                    if self.entry_error_sign == 0.0 {
                        self.entry_error_sign = sign;
                    }
                    else if sign != 0.0 && sign != self.entry_error_sign {
                        self.oscillated = true;
                    }
                }
            }
        }
        else {
            self.in_tolerance_since_s = None;
            self.entry_error_sign = 0.0;
            self.oscillated = false;
        }

        let settled = match self.in_tolerance_since_s {
            Some(t0) => now_s - t0 >= self.params.settling_time_s,
            None => false,
        };

        self.on_target =
            settled && !(self.params.no_oscillation && self.oscillated);
    }

    fn update_stall(&mut self, measured: f64, raw_output: f64, now_s: f64) {
        let saturated = self.params.output_limit > 0.0
            && raw_output.abs() >= self.params.output_limit;

        if self.params.stall_timeout_s <= 0.0 || !saturated {
            self.stall_ref = None;
            self.stalled = false;
            return;
        }

        match self.stall_ref {
            None => self.stall_ref = Some((measured, now_s)),
            Some((m0, _))
                if (measured - m0).abs() > self.params.stall_noise_threshold =>
            {
                self.stall_ref = Some((measured, now_s));
                self.stalled = false;
            }
            Some((_, t0)) => {
                self.stalled = now_s - t0 >= self.params.stall_timeout_s;
            }
        }
    }
}

fn sign_of(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    }
    else if value < 0.0 {
        -1.0
    }
    else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(k_p: f64, k_i: f64, k_d: f64) -> PidParams {
        PidParams::new(PidCoefficients::new(k_p, k_i, k_d), 1.0)
    }

    #[test]
    fn test_output_bound() {
        let gains = [0.0, 0.01, 1.0, 50.0, -3.0, 1e9];
        let measurements = [-1e6, -10.0, -0.5, 0.0, 0.5, 10.0, 1e6, f64::NAN];

        for &k in gains.iter() {
            let mut ctrl = PidController::new("bound", params(k, k, k));
            ctrl.set_output_limit(0.5);
            ctrl.set_setpoint(3.0);

            for (i, &m) in measurements.iter().enumerate() {
                let out = ctrl.compute(m, i as f64 * 0.02);
                assert!(out >= -0.5 && out <= 0.5, "k={}, m={}: {}", k, m, out);
            }
        }
    }

    #[test]
    fn test_relative_and_absolute_target() {
        let mut rel = PidController::new("rel", params(0.1, 0.0, 0.0));
        rel.set_target(12.0, 10.0);
        assert_eq!(rel.get_setpoint(), 22.0);

        let mut p = params(0.1, 0.0, 0.0);
        p.absolute_setpoint = true;
        let mut abs = PidController::new("abs", p);
        abs.set_target(12.0, 10.0);
        assert_eq!(abs.get_setpoint(), 12.0);

        let out = abs.compute(10.0, 0.0);
        assert!((out - 0.2).abs() < 1e-9);
        assert!((abs.get_error() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_first_call_skips_integral_and_derivative() {
        let mut ctrl = PidController::new("pid", params(0.0, 1.0, 1.0));
        ctrl.set_output_limit(100.0);
        ctrl.set_setpoint(10.0);

        assert_eq!(ctrl.compute(0.0, 1.0), 0.0);

        // Integral of 10 over 0.5 s plus derivative of the error change
        let out = ctrl.compute(2.0, 1.5);
        assert!((out - (8.0 * 0.5 + (8.0 - 10.0) / 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_integral_clamp_and_reset() {
        let mut ctrl = PidController::new("int", params(0.0, 1.0, 0.0));
        ctrl.set_setpoint(100.0);

        for i in 0..100 {
            ctrl.compute(0.0, i as f64);
        }
        assert!(ctrl.get_info().integral <= 1.0 + 1e-9);

        // Changing the target drops the integral
        ctrl.set_setpoint(50.0);
        assert_eq!(ctrl.get_info().integral, 0.0);
    }

    #[test]
    fn test_on_target_determinism() {
        let mut ctrl = PidController::new("ot", params(0.1, 0.0, 0.0));
        ctrl.set_setpoint(10.0);

        let measurements = [0.0, 4.0, 7.0, 8.5, 9.0, 9.5, 9.8, 9.9];
        let mut first_on = None;

        for (i, &m) in measurements.iter().enumerate() {
            ctrl.compute(m, i as f64 * 0.1);

            if (10.0 - m).abs() <= 1.0 {
                assert!(ctrl.is_on_target(), "tick {}", i);
                first_on.get_or_insert(i);
            }
            else {
                assert!(!ctrl.is_on_target(), "tick {}", i);
            }
        }

        assert_eq!(first_on, Some(4));
    }

    #[test]
    fn test_settling_time() {
        let mut p = params(0.1, 0.0, 0.0);
        p.settling_time_s = 0.2;
        let mut ctrl = PidController::new("settle", p);
        ctrl.set_setpoint(0.0);

        ctrl.compute(0.5, 0.0);
        assert!(!ctrl.is_on_target());
        ctrl.compute(0.5, 0.1);
        assert!(!ctrl.is_on_target());
        ctrl.compute(0.5, 0.2);
        assert!(ctrl.is_on_target());

        // Leaving tolerance restarts the debounce
        ctrl.compute(2.0, 0.3);
        ctrl.compute(0.5, 0.4);
        assert!(!ctrl.is_on_target());
    }

    #[test]
    fn test_no_oscillation() {
        let mut p = params(0.1, 0.0, 0.0);
        p.no_oscillation = true;
        let mut ctrl = PidController::new("osc", p);
        ctrl.set_setpoint(0.0);

        ctrl.compute(-0.5, 0.0);
        assert!(ctrl.is_on_target());

        // Overshoot inside tolerance: error changes sign
        ctrl.compute(0.5, 0.1);
        assert!(!ctrl.is_on_target());

        // Leaving and re-entering tolerance gives a fresh chance
        ctrl.compute(2.0, 0.2);
        ctrl.compute(0.5, 0.3);
        assert!(ctrl.is_on_target());

        // Without the mode the overshoot is still on target
        ctrl.set_no_oscillation(false);
        ctrl.compute(-0.5, 0.4);
        assert!(ctrl.is_on_target());
    }

    #[test]
    fn test_stall_detection() {
        let mut p = params(1.0, 0.0, 0.0);
        p.stall_timeout_s = 0.5;
        p.stall_noise_threshold = 0.1;
        let mut ctrl = PidController::new("stall", p);
        ctrl.set_setpoint(100.0);

        ctrl.compute(0.0, 0.0);
        ctrl.compute(0.05, 0.3);
        assert!(!ctrl.is_stalled());
        ctrl.compute(0.05, 0.5);
        assert!(ctrl.is_stalled());

        // Progress clears the stall
        ctrl.compute(5.0, 0.6);
        assert!(!ctrl.is_stalled());

        // Unsaturated output never stalls
        ctrl.set_setpoint(5.5);
        for i in 0..10 {
            ctrl.compute(5.0, 1.0 + i as f64);
        }
        assert!(!ctrl.is_stalled());
    }

    #[test]
    fn test_save_restore_output_limit() {
        let mut ctrl = PidController::new("limit", params(1.0, 0.0, 0.0));
        assert_eq!(ctrl.get_output_limit(), 1.0);

        assert_eq!(ctrl.save_and_set_output_limit(0.5), 1.0);
        assert_eq!(ctrl.save_and_set_output_limit(0.25), 0.5);
        assert_eq!(ctrl.get_output_limit(), 0.25);

        assert_eq!(ctrl.restore_output_limit(), Some(1.0));
        assert_eq!(ctrl.get_output_limit(), 1.0);
        assert_eq!(ctrl.restore_output_limit(), None);
    }
}
