//! Speed and acceleration limiting of velocity requests

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::{pose::Velocity2D, simple_drive::MotorConstants, MIN_DT_S};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Which limits were hit while constraining a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LimitFlags {
    pub speed_limited: bool,
    pub accel_limited: bool,
    pub omega_limited: bool,
    pub alpha_limited: bool,
    pub dt_rejected: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Constrain a requested velocity against the robot's capabilities.
///
/// The translational magnitude is capped at the maximum velocity and the
/// angular rate at the maximum angular velocity. The change from `previous`
/// is then limited to what the acceleration caps allow in `dt`. The
/// translational change is limited as a vector, so the direction of the
/// change is preserved.
///
/// A `dt` shorter than [`MIN_DT_S`] (or non-finite) returns `previous`.
/// Non-finite request components are treated as zero.
pub fn constrain_new_speed_pose(
    constants: &MotorConstants,
    requested: Velocity2D,
    previous: Velocity2D,
    dt: f64
) -> Velocity2D {
    constrain_with_flags(constants, requested, previous, dt).0
}

/// As [`constrain_new_speed_pose`] but also reports which limits were hit.
pub fn constrain_with_flags(
    constants: &MotorConstants,
    requested: Velocity2D,
    previous: Velocity2D,
    dt: f64
) -> (Velocity2D, LimitFlags) {
    let mut flags = LimitFlags::default();
    let previous = previous.sanitised();

    if !(dt.is_finite() && dt >= MIN_DT_S) {
        flags.dt_rejected = true;
        return (previous, flags);
    }

    let max_v = constants.max_velocity_ins;
    let max_w = constants.max_angular_velocity_rads;

    // Magnitude caps
    let req = requested.sanitised();
    let capped = req.constrain_xy_mag(max_v);
    flags.speed_limited = capped != req;
    let capped_w = capped.constrain_omega(max_w);
    flags.omega_limited = capped_w != capped;
    let capped = capped_w;

    // Translational acceleration, limited as a vector
    let accel = if capped.magnitude() < previous.magnitude() {
        constants.max_deceleration()
    }
    else {
        constants.max_acceleration_ins2
    };
    let max_dv = accel * dt;
    let dvx = capped.vx - previous.vx;
    let dvy = capped.vy - previous.vy;
    let dv = dvx.hypot(dvy);

    let (vx, vy) = if dv > max_dv {
        flags.accel_limited = true;
        let k = max_dv / dv;
        (previous.vx + dvx * k, previous.vy + dvy * k)
    }
    else {
        (capped.vx, capped.vy)
    };

    // Angular acceleration
    let max_dw = constants.max_angular_acceleration_rads2 * dt;
    let dw = capped.omega - previous.omega;

    let omega = if dw.abs() > max_dw {
        flags.alpha_limited = true;
        previous.omega + max_dw.copysign(dw)
    }
    else {
        capped.omega
    };

    let out = Velocity2D::new(vx, vy, omega)
        .constrain_xy_mag(max_v)
        .constrain_omega(max_w);

    (out, flags)
}
