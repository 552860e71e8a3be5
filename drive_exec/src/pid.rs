//! # PID controller
//!
//! Single axis PID controller with a clamped integral, a filtered derivative
//! and optional output slew limiting. Independent of the drivetrain, the
//! caller supplies the error and the time step.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::MIN_DT_S;
use util::maths::{clamp, clamp_abs, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Tuning of one PID controller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PidConfig {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Back-calculation anti-windup gain, bleeds the integral while the
    /// output is saturated.
    #[serde(default)]
    pub k_aw: f64,

    pub output_min: f64,
    pub output_max: f64,

    /// Bound on the magnitude of the integral term. The term is stored with
    /// `k_i` already applied, so this is in output units.
    pub integral_limit: f64,

    /// Time constant of the first order filter on the derivative, zero for
    /// no filtering.
    ///
    /// Units: seconds
    #[serde(default)]
    pub derivative_filter_s: f64,

    /// Maximum rate of change of the output.
    ///
    /// Units: output units/second
    #[serde(default)]
    pub max_output_rate: Option<f64>,

    /// Treat the error as an angle and wrap it into (-pi, pi].
    #[serde(default)]
    pub wrap_error: bool,
}

/// A PID controller
#[derive(Debug, Clone)]
pub struct Pid {
    config: PidConfig,

    /// The integral accumulation, gain applied
    integral: f64,

    /// Previous error, `None` until the first valid step
    prev_error: Option<f64>,

    /// Filtered derivative from the previous step
    derivative: f64,

    /// Unsaturated command from the previous step
    prev_command: f64,

    /// Saturated output from the previous step
    output: f64,
}

/// Serialisable view of a controller's internal state.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PidSnapshot {
    pub integral: f64,
    pub prev_error: Option<f64>,
    pub derivative: f64,
    pub output: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PidError {
    #[error("Invalid PID configuration: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidConfig {
    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), PidError> {
        let finite = [
            self.k_p, self.k_i, self.k_d, self.k_aw,
            self.output_min, self.output_max,
            self.integral_limit, self.derivative_filter_s
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(PidError::InvalidConfig("all values must be finite".into()));
        }
        if self.output_min > self.output_max {
            return Err(PidError::InvalidConfig(format!(
                "output_min ({}) is greater than output_max ({})",
                self.output_min, self.output_max
            )));
        }
        if self.integral_limit < 0.0 || self.derivative_filter_s < 0.0 {
            return Err(PidError::InvalidConfig(
                "integral_limit and derivative_filter_s must not be negative".into()
            ));
        }
        if let Some(r) = self.max_output_rate {
            if !(r.is_finite() && r > 0.0) {
                return Err(PidError::InvalidConfig(format!(
                    "max_output_rate must be positive, found {}", r
                )));
            }
        }

        Ok(())
    }
}

impl Pid {

    /// Create a new controller, rejecting unusable tuning.
    pub fn new(config: PidConfig) -> Result<Self, PidError> {
        config.validate()?;

        Ok(Self {
            config,
            integral: 0.0,
            prev_error: None,
            derivative: 0.0,
            prev_command: 0.0,
            output: 0.0,
        })
    }

    /// Advance the controller by one step.
    ///
    /// ## Arguments
    /// - `error` - Setpoint minus measurement.
    /// - `dt` - Time since the previous step in seconds.
    ///
    /// If `dt` is shorter than [`MIN_DT_S`], or either input is not finite,
    /// the state is left untouched and the previous output is returned.
    pub fn step(&mut self, error: f64, dt: f64) -> f64 {
        if !(dt.is_finite() && dt >= MIN_DT_S && error.is_finite()) {
            return self.output;
        }

        let c = &self.config;

        let error = match c.wrap_error {
            true => wrap_pi(error),
            false => error
        };

        // Integral with back-calculation, clamped against windup
        self.integral = clamp_abs(
            self.integral 
                + (c.k_i * error + c.k_aw * (self.output - self.prev_command)) * dt,
            c.integral_limit
        );

        // No derivative on the first step, there is nothing to difference
        // against
        self.derivative = match self.prev_error {
            Some(prev) => {
                (error - prev + c.derivative_filter_s * self.derivative)
                    / (dt + c.derivative_filter_s)
            },
            None => 0.0
        };

        let command = c.k_p * error + self.integral + c.k_d * self.derivative;

        let mut output = clamp(command, c.output_min, c.output_max);
        if let Some(rate) = c.max_output_rate {
            let max_step = rate * dt;
            output = clamp(output, self.output - max_step, self.output + max_step);
        }

        self.prev_error = Some(error);
        self.prev_command = command;
        self.output = output;

        output
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.derivative = 0.0;
        self.prev_command = 0.0;
        self.output = 0.0;
    }

    /// Clear only the integral, derivative history is kept.
    pub fn reset_integral(&mut self) {
        self.integral = 0.0;
        self.prev_command = self.output;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PidSnapshot {
        PidSnapshot {
            integral: self.integral,
            prev_error: self.prev_error,
            derivative: self.derivative,
            output: self.output,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config() -> PidConfig {
        PidConfig {
            k_p: 1.0,
            k_i: 0.5,
            k_d: 0.1,
            k_aw: 0.0,
            output_min: -10.0,
            output_max: 10.0,
            integral_limit: 2.0,
            derivative_filter_s: 0.0,
            max_output_rate: None,
            wrap_error: false,
        }
    }

    #[test]
    fn test_first_step() {
        let mut pid = Pid::new(config()).unwrap();

        // P plus one slice of integral, no derivative yet
        assert_abs_diff_eq!(pid.step(2.0, 0.1), 2.0 + 0.5 * 2.0 * 0.1);

        // Derivative kicks in on the second step
        let out = pid.step(1.0, 0.1);
        let integral = 0.1 + 0.05;
        assert_abs_diff_eq!(out, 1.0 + integral + 0.1 * (1.0 - 2.0) / 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_integral_bounded() {
        let mut pid = Pid::new(config()).unwrap();

        for _ in 0..10_000 {
            pid.step(50.0, 0.02);
            assert!(pid.integral().abs() <= 2.0);
        }
        assert_abs_diff_eq!(pid.integral(), 2.0);
        assert_abs_diff_eq!(pid.output(), 10.0);

        for _ in 0..10_000 {
            pid.step(-50.0, 0.02);
            assert!(pid.integral().abs() <= 2.0);
        }
        assert_abs_diff_eq!(pid.integral(), -2.0);
    }

    #[test]
    fn test_bad_inputs_hold_output() {
        let mut pid = Pid::new(config()).unwrap();
        let out = pid.step(1.0, 0.02);
        let before = pid.snapshot();

        assert_eq!(pid.step(5.0, 0.0), out);
        assert_eq!(pid.step(5.0, 1e-6), out);
        assert_eq!(pid.step(f64::NAN, 0.02), out);
        assert_eq!(pid.step(5.0, f64::INFINITY), out);

        let after = pid.snapshot();
        assert_eq!(before.integral, after.integral);
        assert_eq!(before.prev_error, after.prev_error);
    }

    #[test]
    fn test_derivative_filter() {
        let mut raw = Pid::new(PidConfig { k_p: 0.0, k_i: 0.0, ..config() }).unwrap();
        let mut filtered = Pid::new(PidConfig {
            k_p: 0.0, k_i: 0.0, derivative_filter_s: 0.1, ..config()
        }).unwrap();

        raw.step(0.0, 0.02);
        filtered.step(0.0, 0.02);

        // A step in the error spikes the raw derivative far more
        let r = raw.step(1.0, 0.02);
        let f = filtered.step(1.0, 0.02);
        assert_abs_diff_eq!(r, 0.1 * 1.0 / 0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(f, 0.1 * 1.0 / 0.12, epsilon = 1e-12);

        // and the filtered derivative decays rather than vanishing
        assert_abs_diff_eq!(raw.step(1.0, 0.02), 0.0, epsilon = 1e-12);
        assert!(filtered.step(1.0, 0.02) > 0.0);
    }

    #[test]
    fn test_output_rate_limit() {
        let mut pid = Pid::new(PidConfig { max_output_rate: Some(5.0), ..config() }).unwrap();

        assert_abs_diff_eq!(pid.step(8.0, 0.1), 0.5);
        assert_abs_diff_eq!(pid.step(8.0, 0.1), 1.0);
    }

    #[test]
    fn test_wrapped_error() {
        let mut pid = Pid::new(PidConfig { 
            k_i: 0.0, k_d: 0.0, wrap_error: true, ..config() 
        }).unwrap();

        let err = (-170f64).to_radians() - 170f64.to_radians();
        assert_abs_diff_eq!(pid.step(err, 0.02), 20f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_resets() {
        let mut pid = Pid::new(config()).unwrap();
        pid.step(3.0, 0.1);
        pid.step(3.0, 0.1);

        pid.reset_integral();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.snapshot().prev_error, Some(3.0));

        pid.reset();
        assert_eq!(pid.snapshot().prev_error, None);
        assert_eq!(pid.output(), 0.0);
    }

    #[test]
    fn test_invalid_config() {
        assert!(Pid::new(PidConfig { output_min: 1.0, output_max: -1.0, ..config() }).is_err());
        assert!(Pid::new(PidConfig { k_p: f64::NAN, ..config() }).is_err());
        assert!(Pid::new(PidConfig { max_output_rate: Some(0.0), ..config() }).is_err());
    }
}
