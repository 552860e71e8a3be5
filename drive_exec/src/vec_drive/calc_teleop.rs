//! Joystick to velocity mapping for driver control

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::{pose::Velocity2D, simple_drive::MotorConstants};
use util::maths::{clamp, wrap_pi};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Map driver stick axes onto a robot frame velocity request.
///
/// ## Arguments
/// - `x`, `y` - Translation axes in [-1, 1], field oriented.
/// - `theta` - Rotation axis in [-1, 1], positive turns clockwise.
/// - `yaw` - Current robot heading in radians.
/// - `position_control` - When set the yaw is ignored and the axes are taken
///   as robot oriented.
///
/// Axes inside the deadband are zeroed. The result is rotated by
/// `-yaw + driver_start_offset_rad` so that pushing the stick away from the
/// driver always moves the robot away from the driver.
pub fn calc_teleop_velocity(
    constants: &MotorConstants,
    x: f64,
    y: f64,
    theta: f64,
    yaw: f64,
    position_control: bool
) -> Velocity2D {
    let axis = |a: f64| {
        if a.is_finite() && a.abs() > constants.rc_deadband {
            clamp(a, -1.0, 1.0)
        }
        else {
            0.0
        }
    };

    let max_v = constants.max_velocity_ins;
    let max_w = constants.max_angular_velocity_rads;

    let request = Velocity2D::new(axis(x) * max_v, axis(y) * max_v, -axis(theta) * max_w)
        .constrain_xy_mag(max_v)
        .constrain_omega(max_w);

    let yaw = match position_control || !yaw.is_finite() {
        true => 0.0,
        false => yaw
    };

    request.rotated(wrap_pi(-yaw + constants.driver_start_offset_rad))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::three_wheel_constants;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_deadband() {
        let c = three_wheel_constants();

        let v = calc_teleop_velocity(&c, 0.04, -0.03, 0.049, 0.0, false);

        assert_eq!(v, Velocity2D::ZERO);
    }

    #[test]
    fn test_scaling_and_diagonal_cap() {
        let c = three_wheel_constants();

        let v = calc_teleop_velocity(&c, 1.0, 1.0, 0.5, 0.0, false);

        assert_abs_diff_eq!(v.magnitude(), c.max_velocity_ins, epsilon = 1e-12);
        assert_abs_diff_eq!(v.vx, v.vy, epsilon = 1e-12);
        assert_abs_diff_eq!(v.omega, -0.5 * c.max_angular_velocity_rads);
    }

    #[test]
    fn test_field_oriented() {
        let c = three_wheel_constants();

        // Robot facing +Y, stick pushed along field +X: robot must strafe right
        let v = calc_teleop_velocity(&c, 0.5, 0.0, 0.0, FRAC_PI_2, false);
        assert_abs_diff_eq!(v.vx, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.vy, -12.0, epsilon = 1e-12);

        // Position control ignores the yaw
        let v = calc_teleop_velocity(&c, 0.5, 0.0, 0.0, FRAC_PI_2, true);
        assert_abs_diff_eq!(v.vx, 12.0, epsilon = 1e-12);
    }
}
