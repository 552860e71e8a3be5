//! Inverse kinematics from body velocity to motor duty

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::{
    pose::Velocity2D,
    simple_drive::{MotorConstants, MotorSetup}
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Resolve a body frame velocity into one normalised duty per motor.
///
/// Each motor's surface speed is the projection of the translation onto its
/// drive axis plus the rotation rate times its lever arm, divided by the free
/// wheel speed. If any duty would exceed 1 in magnitude every duty is scaled
/// down by the same factor, so the direction of motion is preserved.
///
/// Returns the duties and whether the rescale was applied.
pub fn calc_rc_vector(
    constants: &MotorConstants,
    setups: &[MotorSetup],
    velocity: &Velocity2D
) -> (Vec<f64>, bool) {
    let max_speed = constants.max_wheel_speed_ins();

    let mut duty: Vec<f64> = setups
        .iter()
        .map(|s| {
            let row = s.kinematic_row();
            (row[0] * velocity.vx + row[1] * velocity.vy + row[2] * velocity.omega)
                / max_speed
        })
        .collect();

    let peak = duty.iter().fold(0f64, |m, d| m.max(d.abs()));

    if peak > 1.0 {
        duty.iter_mut().for_each(|d| *d /= peak);
        (duty, true)
    }
    else {
        (duty, false)
    }
}
