//! Physical constants and motor layout for the drivetrain

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::DriveError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Physical constants of the robot.
///
/// One instance is loaded at startup and handed by reference to every layer
/// that needs it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotorConstants {

    // ---- GEOMETRY ----

    /// Diameter of the drive wheels.
    ///
    /// Units: inches
    pub wheel_diameter_in: f64,

    /// Distance between the left and right wheels.
    ///
    /// Units: inches
    pub track_width_in: f64,

    // ---- MOTORS ----

    /// Reduction between the motor shaft and the wheel.
    pub gear_ratio: f64,

    /// Encoder ticks per motor shaft revolution.
    pub ticks_per_rev: f64,

    /// Motor shaft speed at full duty with no load.
    ///
    /// Units: revolutions/minute
    pub motor_free_rpm: f64,

    // ---- CAPABILITIES ----

    /// Maximum translational speed of the robot body.
    ///
    /// Units: inches/second
    pub max_velocity_ins: f64,

    /// Maximum translational acceleration.
    ///
    /// Units: inches/second^2
    pub max_acceleration_ins2: f64,

    /// Maximum translational deceleration, defaults to the acceleration limit.
    /// May not exceed the acceleration limit.
    ///
    /// Units: inches/second^2
    #[serde(default)]
    pub max_deceleration_ins2: Option<f64>,

    /// Maximum rotation rate of the robot body.
    ///
    /// Units: radians/second
    pub max_angular_velocity_rads: f64,

    /// Maximum rotational acceleration.
    ///
    /// Units: radians/second^2
    pub max_angular_acceleration_rads2: f64,

    // ---- DRIVER INPUT ----

    /// Joystick values with a magnitude below this are treated as zero.
    #[serde(default = "MotorConstants::default_rc_deadband")]
    pub rc_deadband: f64,

    /// Heading of the driver's "forward" relative to the field X axis.
    ///
    /// Units: radians
    #[serde(default)]
    pub driver_start_offset_rad: f64,
}

/// Describes one motor of the drivetrain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotorSetup {
    /// Human readable name, used in logs and snapshots.
    pub name: String,

    /// Direction of the wheel's drive axis in the robot body frame, measured
    /// from the body X axis.
    ///
    /// Units: radians
    pub drive_axis_rad: f64,

    /// Scale applied to the translational contribution, compensates wheels
    /// with a different effective radius.
    #[serde(default = "MotorSetup::default_gain")]
    pub gain: f64,

    /// Signed distance from the centre of rotation to the wheel's drive line.
    /// A positive lever arm drives the wheel forwards for a positive
    /// (counter-clockwise) rotation rate.
    ///
    /// Units: inches
    pub lever_arm_in: f64,

    /// Whether the motor (and its encoder) is mounted reversed.
    #[serde(default)]
    pub inverted: bool,

    /// Encoder channel attached to this motor, if any.
    #[serde(default)]
    pub encoder: Option<usize>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotorConstants {
    fn default_rc_deadband() -> f64 {
        0.05
    }

    /// Wheel circumference.
    ///
    /// Units: inches
    pub fn wheel_circumference_in(&self) -> f64 {
        PI * self.wheel_diameter_in
    }

    /// Distance travelled by the wheel per encoder tick.
    ///
    /// Units: inches
    pub fn in_per_tick(&self) -> f64 {
        self.wheel_circumference_in() / self.ticks_per_rev / self.gear_ratio
    }

    /// Surface speed of a wheel driven at full duty.
    ///
    /// Units: inches/second
    pub fn max_wheel_speed_ins(&self) -> f64 {
        self.motor_free_rpm / 60.0 / self.gear_ratio * self.wheel_circumference_in()
    }

    /// Deceleration limit, falling back to the acceleration limit.
    ///
    /// Never more than the acceleration limit, which bounds every change of
    /// velocity in a cycle.
    ///
    /// Units: inches/second^2
    pub fn max_deceleration(&self) -> f64 {
        match self.max_deceleration_ins2 {
            Some(d) => d.min(self.max_acceleration_ins2),
            None => self.max_acceleration_ins2
        }
    }

    /// Check all physical constants are usable.
    pub fn validate(&self) -> Result<(), DriveError> {
        let positive = [
            ("wheel_diameter_in", self.wheel_diameter_in),
            ("track_width_in", self.track_width_in),
            ("gear_ratio", self.gear_ratio),
            ("ticks_per_rev", self.ticks_per_rev),
            ("motor_free_rpm", self.motor_free_rpm),
            ("max_velocity_ins", self.max_velocity_ins),
            ("max_acceleration_ins2", self.max_acceleration_ins2),
            ("max_deceleration_ins2", self.max_deceleration()),
            ("max_angular_velocity_rads", self.max_angular_velocity_rads),
            ("max_angular_acceleration_rads2", self.max_angular_acceleration_rads2),
        ];

        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(DriveError::InvalidConstants(format!(
                    "{} must be positive and finite, found {}",
                    name, value
                )));
            }
        }

        if let Some(d) = self.max_deceleration_ins2 {
            if !(d.is_finite() && d > 0.0 && d <= self.max_acceleration_ins2) {
                return Err(DriveError::InvalidConstants(format!(
                    "max_deceleration_ins2 must be positive and no more than \
                    max_acceleration_ins2 ({}), found {}",
                    self.max_acceleration_ins2, d
                )));
            }
        }

        if !(self.rc_deadband.is_finite() && self.rc_deadband >= 0.0 && self.rc_deadband < 1.0) {
            return Err(DriveError::InvalidConstants(format!(
                "rc_deadband must be in [0, 1), found {}",
                self.rc_deadband
            )));
        }

        if !self.driver_start_offset_rad.is_finite() {
            return Err(DriveError::InvalidConstants(
                "driver_start_offset_rad must be finite".into()
            ));
        }

        Ok(())
    }
}

impl MotorSetup {
    fn default_gain() -> f64 {
        1.0
    }

    /// The row of the drivetrain's kinematic matrix for this motor.
    ///
    /// Wheel surface speed = row . (vx, vy, omega)
    pub fn kinematic_row(&self) -> [f64; 3] {
        [
            self.gain * self.drive_axis_rad.cos(),
            self.gain * self.drive_axis_rad.sin(),
            self.lever_arm_in,
        ]
    }

    /// Sign applied between logical and hardware direction.
    pub fn direction(&self) -> f64 {
        if self.inverted { -1.0 } else { 1.0 }
    }
}
