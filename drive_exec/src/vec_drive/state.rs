//! Implementations for the VectorDrive state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;

// Internal
use super::{calc_rc_vector, calc_teleop_velocity, constrain_with_flags, LimitFlags};
use crate::{
    hw::{DriveHardware, PoseProvider},
    pose::{Pose2D, Velocity2D},
    simple_drive::{DriveError, MotorConstants, SimpleDrive}
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Holonomic drive over a [`SimpleDrive`].
pub struct VectorDrive<H: DriveHardware> {
    drive: SimpleDrive<H>,

    /// Last constrained velocity sent to the motors.
    velocity: Velocity2D,

    /// Last velocity requested by the caller.
    requested: Velocity2D,

    report: StatusReport,
}

/// Status report for the last velocity command.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub limits: LimitFlags,

    /// Set if the motor duties had to be scaled down to fit in [-1, 1].
    pub duty_rescaled: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<H: DriveHardware> VectorDrive<H> {
    pub fn new(drive: SimpleDrive<H>) -> Self {
        Self {
            drive,
            velocity: Velocity2D::ZERO,
            requested: Velocity2D::ZERO,
            report: StatusReport::default(),
        }
    }

    pub fn begin(&mut self) -> Result<(), DriveError> {
        self.velocity = Velocity2D::ZERO;
        self.requested = Velocity2D::ZERO;
        self.drive.begin()
    }

    /// Preview the velocity a request would be constrained to, without
    /// committing it.
    pub fn get_ideal_velocity(&self, requested: Velocity2D, dt: f64) -> Velocity2D {
        constrain_with_flags(self.drive.constants(), requested, self.velocity, dt).0
    }

    /// Command a body frame velocity.
    ///
    /// The request is constrained, resolved into motor duties and queued on
    /// the simple drive. Nothing reaches the motors until
    /// [`VectorDrive::write`]. Returns the constrained velocity.
    pub fn set(&mut self, requested: Velocity2D, dt: f64) -> Result<Velocity2D, DriveError> {
        let (velocity, limits) = constrain_with_flags(
            self.drive.constants(), requested, self.velocity, dt
        );
        let (duty, duty_rescaled) = calc_rc_vector(
            self.drive.constants(), self.drive.setups(), &velocity
        );

        self.drive.set(&duty)?;

        if limits != self.report.limits {
            debug!("Velocity limits changed: {:?}", limits);
        }
        trace!("Requested {}, constrained {}", requested, velocity);

        self.requested = requested;
        self.velocity = velocity;
        self.report = StatusReport { limits, duty_rescaled };

        Ok(velocity)
    }

    /// Stop immediately, bypassing the deceleration limit.
    ///
    /// Every motor demand is exactly zero afterwards.
    pub fn stop(&mut self) -> Result<(), DriveError> {
        let zeros = vec![0.0; self.drive.num_motors()];
        self.drive.set(&zeros)?;

        self.requested = Velocity2D::ZERO;
        self.velocity = Velocity2D::ZERO;
        self.report = StatusReport::default();

        Ok(())
    }

    /// Drive from joystick axes, see [`calc_teleop_velocity`].
    pub fn teleop(
        &mut self,
        x: f64,
        y: f64,
        theta: f64,
        yaw: f64,
        position_control: bool,
        dt: f64
    ) -> Result<Velocity2D, DriveError> {
        let request = calc_teleop_velocity(
            self.drive.constants(), x, y, theta, yaw, position_control
        );
        self.set(request, dt)
    }

    /// The last constrained velocity, not the last request.
    pub fn get_velocity(&self) -> Velocity2D {
        self.velocity
    }

    pub fn get_requested(&self) -> Velocity2D {
        self.requested
    }

    pub fn status_report(&self) -> StatusReport {
        self.report
    }

    /// Push the queued duties to the motors.
    pub fn write(&mut self) -> Result<(), DriveError> {
        self.drive.write()
    }

    /// Read the encoders and advance the localisation.
    pub fn update(&mut self, yaw: Option<f64>) -> Result<Pose2D, DriveError> {
        self.drive.read_all(yaw)
    }

    pub fn position(&self) -> Pose2D {
        self.drive.position()
    }

    pub fn set_position(&mut self, pose: Pose2D) {
        self.drive.set_position(pose)
    }

    pub fn constants(&self) -> &MotorConstants {
        self.drive.constants()
    }

    pub fn simple(&self) -> &SimpleDrive<H> {
        &self.drive
    }

    pub fn simple_mut(&mut self) -> &mut SimpleDrive<H> {
        &mut self.drive
    }
}

impl<H: DriveHardware> PoseProvider for VectorDrive<H> {
    fn pose(&self) -> Pose2D {
        self.position()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{three_wheel_setups, sim_drive};
    use approx::assert_abs_diff_eq;

    const DT: f64 = 0.02;

    #[test]
    fn test_ramps_to_request() {
        let mut drive = VectorDrive::new(sim_drive(three_wheel_setups()));
        let target = Velocity2D::new(12.0, 0.0, 0.0);

        // 48 in/s^2 reaches 12 in/s in 0.25 s
        for _ in 0..12 {
            drive.set(target, DT).unwrap();
            assert!(drive.status_report().limits.accel_limited);
        }
        for _ in 0..2 {
            drive.set(target, DT).unwrap();
        }

        assert_eq!(drive.get_velocity(), target);
        assert!(!drive.status_report().limits.accel_limited);
    }

    #[test]
    fn test_ideal_velocity_does_not_commit() {
        let mut drive = VectorDrive::new(sim_drive(three_wheel_setups()));

        let preview = drive.get_ideal_velocity(Velocity2D::new(20.0, 0.0, 0.0), DT);
        assert_abs_diff_eq!(preview.vx, 48.0 * DT, epsilon = 1e-12);
        assert_eq!(drive.get_velocity(), Velocity2D::ZERO);

        let set = drive.set(Velocity2D::new(20.0, 0.0, 0.0), DT).unwrap();
        assert_eq!(set, preview);
        assert_eq!(drive.get_requested(), Velocity2D::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn test_zero_after_motion_is_exact() {
        let mut drive = VectorDrive::new(sim_drive(three_wheel_setups()));

        for _ in 0..30 {
            drive.set(Velocity2D::new(7.0, -3.0, 0.4), DT).unwrap();
        }
        for _ in 0..60 {
            drive.set(Velocity2D::ZERO, DT).unwrap();
        }

        assert_eq!(drive.get_velocity(), Velocity2D::ZERO);
        assert!(drive.simple().demand().iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_stop() {
        let mut drive = VectorDrive::new(sim_drive(three_wheel_setups()));

        for _ in 0..10 {
            drive.set(Velocity2D::new(10.0, 0.0, 0.0), DT).unwrap();
        }
        drive.stop().unwrap();
        drive.write().unwrap();

        assert_eq!(drive.get_velocity(), Velocity2D::ZERO);
        assert!(drive.simple().hardware().duty().iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_teleop_moves_forward() {
        let mut drive = VectorDrive::new(sim_drive(three_wheel_setups()));

        for _ in 0..50 {
            drive.teleop(1.0, 0.0, 0.0, 0.0, false, DT).unwrap();
            drive.write().unwrap();
            drive.simple_mut().hardware_mut().advance(DT);
            drive.update(None).unwrap();
        }

        assert_abs_diff_eq!(drive.get_velocity().vx, 24.0, epsilon = 1e-9);
        assert!(drive.position().x > 10.0);
        assert_abs_diff_eq!(drive.position().y, 0.0, epsilon = 0.1);
    }
}
