//! # Simulated chassis
//!
//! An ideal rigid-body model of the drivetrain implementing the hardware
//! traits, so the full control stack can run without motor boards attached.
//!
//! Each motor's surface speed is its duty multiplied by the free wheel speed.
//! The body velocity is the least-squares fit of those wheel speeds, and the
//! encoders then measure the wheel motion that body velocity actually
//! produces, so inconsistent demands show up as wheel slip.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{DMatrix, DVector, Rotation2, Vector2};

// Internal
use crate::{
    hw::{EncoderSource, HwError, MotorActuator},
    pose::{Pose2D, Velocity2D},
    simple_drive::{DriveError, MotorConstants, MotorSetup}
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulated motor and encoder hardware.
#[derive(Debug, Clone)]
pub struct SimChassis {
    /// Kinematic matrix, one row per motor.
    geometry: DMatrix<f64>,

    /// Pseudo-inverse of `geometry`.
    inverse: DMatrix<f64>,

    directions: Vec<f64>,

    /// Encoder channel of each motor.
    channels: Vec<Option<usize>>,

    max_wheel_speed_ins: f64,
    in_per_tick: f64,

    begun: bool,
    fail_reads: bool,

    /// Last duty written to each motor, hardware sense.
    duty: Vec<f64>,

    /// Accumulated wheel travel per encoder channel, hardware sense.
    ///
    /// Units: inches
    travel_in: Vec<f64>,

    pose: Pose2D,
    velocity: Velocity2D,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimChassis {
    /// Build a chassis for the given motor layout.
    pub fn new(setups: &[MotorSetup], constants: &MotorConstants) -> Result<Self, DriveError> {
        if setups.is_empty() {
            return Err(DriveError::NoMotors);
        }

        let rows: Vec<f64> = setups.iter().flat_map(|s| s.kinematic_row().to_vec()).collect();
        let geometry = DMatrix::from_row_slice(setups.len(), 3, &rows);
        let inverse = geometry
            .clone()
            .pseudo_inverse(1e-9)
            .map_err(|e| DriveError::Geometry(e.to_string()))?;

        let num_encoders = setups
            .iter()
            .filter_map(|s| s.encoder)
            .max()
            .map(|c| c + 1)
            .unwrap_or(0);

        Ok(Self {
            geometry,
            inverse,
            directions: setups.iter().map(|s| s.direction()).collect(),
            channels: setups.iter().map(|s| s.encoder).collect(),
            max_wheel_speed_ins: constants.max_wheel_speed_ins(),
            in_per_tick: constants.in_per_tick(),
            begun: false,
            fail_reads: false,
            duty: vec![0.0; setups.len()],
            travel_in: vec![0.0; num_encoders],
            pose: Pose2D::default(),
            velocity: Velocity2D::ZERO,
        })
    }

    /// Make every subsequent encoder read fail until cleared.
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Last duty written, in hardware sense.
    pub fn duty(&self) -> &[f64] {
        &self.duty
    }

    /// Ground-truth pose of the chassis.
    pub fn true_pose(&self) -> Pose2D {
        self.pose
    }

    /// Ground-truth body frame velocity.
    pub fn true_velocity(&self) -> Velocity2D {
        self.velocity
    }

    /// Place the chassis at a pose, at rest. Encoder counts are kept.
    pub fn set_true_pose(&mut self, pose: Pose2D) {
        self.pose = pose;
        self.velocity = Velocity2D::ZERO;
    }

    /// Ideal gyro yaw, radians.
    pub fn yaw(&self) -> f64 {
        self.pose.heading()
    }

    /// Move the chassis forward in time under the current duty.
    pub fn advance(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        let wheel_speeds = DVector::from_iterator(
            self.duty.len(),
            self.duty
                .iter()
                .zip(self.directions.iter())
                .map(|(d, dir)| d * dir * self.max_wheel_speed_ins),
        );

        let body = &self.inverse * wheel_speeds;
        let realised = &self.geometry * &body;

        for (i, channel) in self.channels.iter().enumerate() {
            if let Some(c) = channel {
                self.travel_in[*c] += realised[i] * self.directions[i] * dt;
            }
        }

        let dheading = body[2] * dt;
        let field = Rotation2::new(self.pose.heading() + 0.5 * dheading)
            * Vector2::new(body[0] * dt, body[1] * dt);

        self.pose = self.pose.translate(field.x, field.y, dheading);
        self.velocity = Velocity2D::new(body[0], body[1], body[2]);

        trace!("Sim pose {}, velocity {}", self.pose, self.velocity);
    }
}

impl MotorActuator for SimChassis {
    fn num_motors(&self) -> usize {
        self.duty.len()
    }

    fn begin(&mut self) -> Result<(), HwError> {
        self.begun = true;
        Ok(())
    }

    fn write(&mut self, duty: &[f64]) -> Result<(), HwError> {
        if !self.begun {
            return Err(HwError::WriteFailed("motors not initialised".into()));
        }
        if duty.len() != self.duty.len() {
            return Err(HwError::WriteFailed(format!(
                "expected {} demands, got {}",
                self.duty.len(),
                duty.len()
            )));
        }

        self.duty.copy_from_slice(duty);

        Ok(())
    }
}

impl EncoderSource for SimChassis {
    fn num_encoders(&self) -> usize {
        self.travel_in.len()
    }

    fn read(&mut self, channel: usize) -> Result<i32, HwError> {
        if self.fail_reads {
            return Err(HwError::ReadFailed {
                channel,
                reason: "injected fault".into()
            });
        }

        match self.travel_in.get(channel) {
            // Counters are 32 bit and wrap
            Some(t) => Ok((t / self.in_per_tick).floor() as i64 as i32),
            None => Err(HwError::NoSuchChannel(channel))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{three_wheel_constants, three_wheel_setups};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_forward_motion() {
        let constants = three_wheel_constants();
        let mut sim = SimChassis::new(&three_wheel_setups(), &constants).unwrap();
        sim.begin().unwrap();

        sim.write(&[0.5, 0.0, 0.5]).unwrap();
        sim.advance(1.0);

        let expected = 0.5 * constants.max_wheel_speed_ins();
        assert_abs_diff_eq!(sim.true_pose().x, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(sim.true_pose().y, 0.0, epsilon = 1e-9);
        assert!(sim.read(1).unwrap().abs() <= 1);
        assert_abs_diff_eq!(sim.true_velocity().vx, expected, epsilon = 1e-9);

        let ticks = sim.read(0).unwrap() as f64;
        assert_abs_diff_eq!(ticks * constants.in_per_tick(), expected, epsilon = constants.in_per_tick());
    }

    #[test]
    fn test_inverted_encoder_counts_backwards() {
        let mut setups = three_wheel_setups();
        setups[0].inverted = true;
        let mut sim = SimChassis::new(&setups, &three_wheel_constants()).unwrap();
        sim.begin().unwrap();

        // Hardware sense, so the inverted left wheel is driven with -0.5
        sim.write(&[-0.5, 0.0, 0.5]).unwrap();
        sim.advance(0.5);

        assert!(sim.true_pose().x > 0.0);
        assert!(sim.read(0).unwrap() < 0);
        assert!(sim.read(2).unwrap() > 0);
    }

    #[test]
    fn test_fault_injection() {
        let mut sim = SimChassis::new(&three_wheel_setups(), &three_wheel_constants()).unwrap();

        sim.set_fail_reads(true);
        assert!(matches!(sim.read(0), Err(HwError::ReadFailed { channel: 0, .. })));
        sim.set_fail_reads(false);
        assert!(matches!(sim.read(5), Err(HwError::NoSuchChannel(5))));
        assert!(sim.write(&[0.0, 0.0, 0.0]).is_err());
    }
}
