//! Shared fixtures for the unit tests

use std::f64::consts::FRAC_PI_2;

use crate::{
    pid::PidConfig,
    pid_drive::{PidDrive, PidDriveParams},
    sim::SimChassis,
    simple_drive::{MotorConstants, MotorSetup, SimpleDrive},
    vec_drive::VectorDrive
};

/// Constants for a small three wheel test chassis, about 51 in/s free speed.
pub fn three_wheel_constants() -> MotorConstants {
    MotorConstants {
        wheel_diameter_in: 3.25,
        track_width_in: 10.0,
        gear_ratio: 1.0,
        ticks_per_rev: 360.0,
        motor_free_rpm: 300.0,
        max_velocity_ins: 24.0,
        max_acceleration_ins2: 48.0,
        max_deceleration_ins2: None,
        max_angular_velocity_rads: 3.0,
        max_angular_acceleration_rads2: 6.0,
        rc_deadband: 0.05,
        driver_start_offset_rad: 0.0,
    }
}

/// Left and right wheels driving along X, a back wheel driving along Y.
pub fn three_wheel_setups() -> Vec<MotorSetup> {
    vec![
        motor("left", 0.0, -5.0, 0),
        motor("back", FRAC_PI_2, 0.0, 1),
        motor("right", 0.0, 5.0, 2),
    ]
}

/// A started drive on a simulated chassis.
pub fn sim_drive(setups: Vec<MotorSetup>) -> SimpleDrive<SimChassis> {
    let constants = three_wheel_constants();
    let sim = SimChassis::new(&setups, &constants).unwrap();
    let mut drive = SimpleDrive::new(sim, setups, constants).unwrap();
    drive.begin().unwrap();
    drive
}

/// Position gains of 1.0 / 0.1 / 0.05 with the integral bounded at 0.5 in/s.
pub fn pid_drive_params() -> PidDriveParams {
    let position = pid(1.0, 0.1, 0.05, 24.0, 0.5);
    let velocity = pid(1.0, 0.2, 0.0, 24.0, 2.0);

    PidDriveParams {
        x: position,
        y: position,
        heading: pid(2.0, 0.0, 0.0, 3.0, 1.0),
        vx: velocity,
        vy: velocity,
        omega: pid(1.0, 0.2, 0.0, 3.0, 0.5),
        reset_threshold_in: 1.0,
        reset_threshold_rad: 0.1,
        reset_threshold_ins: 2.0,
        reset_threshold_rads: 0.2,
    }
}

/// A started closed-loop drive on a simulated chassis.
pub fn sim_pid_drive(params: PidDriveParams) -> PidDrive<SimChassis> {
    let drive = VectorDrive::new(sim_drive(three_wheel_setups()));
    PidDrive::new(drive, params).unwrap()
}

fn pid(k_p: f64, k_i: f64, k_d: f64, limit: f64, integral_limit: f64) -> PidConfig {
    PidConfig {
        k_p,
        k_i,
        k_d,
        k_aw: 0.0,
        output_min: -limit,
        output_max: limit,
        integral_limit,
        derivative_filter_s: 0.0,
        max_output_rate: None,
        wrap_error: false,
    }
}

fn motor(name: &str, axis: f64, lever: f64, encoder: usize) -> MotorSetup {
    MotorSetup {
        name: name.into(),
        drive_axis_rad: axis,
        gain: 1.0,
        lever_arm_in: lever,
        inverted: false,
        encoder: Some(encoder),
    }
}
