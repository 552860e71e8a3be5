//! Implementations for the SimpleDrive state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::collections::HashSet;

// Internal
use super::{DriveError, MotorConstants, MotorSetup};
use crate::{
    hw::{DriveHardware, PoseProvider},
    loc::{LocalInfo, LocalizationEncoder},
    pose::Pose2D
};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Raw per-motor drivetrain.
///
/// Demands are queued by [`SimpleDrive::set`] and only reach the hardware on
/// [`SimpleDrive::write`]. Encoder counts are snapshotted by
/// [`SimpleDrive::read_all`], which also advances the localisation.
pub struct SimpleDrive<H: DriveHardware> {
    hw: H,

    setups: Vec<MotorSetup>,
    constants: MotorConstants,

    begun: bool,

    /// Queued logical demand per motor, in [-1, 1].
    demand: Vec<f64>,

    /// Last raw count read from each encoder channel.
    enc: Vec<i32>,

    loc: LocalizationEncoder,
}

/// Diagnostic snapshot of one motor.
#[derive(Debug, Clone, Serialize)]
pub struct MotorInfo {
    pub name: String,
    pub demand: f64,
    pub inverted: bool,
    pub encoder_ticks: Option<i32>,
}

/// Diagnostic snapshot of the whole drive.
#[derive(Debug, Clone, Serialize)]
pub struct DriveInfo {
    pub begun: bool,
    pub pose: Pose2D,
    pub motors: Vec<MotorInfo>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<H: DriveHardware> SimpleDrive<H> {

    /// Create a new drive over the given hardware.
    ///
    /// The hardware is not touched until [`SimpleDrive::begin`] is called.
    pub fn new(
        hw: H, 
        setups: Vec<MotorSetup>, 
        constants: MotorConstants
    ) -> Result<Self, DriveError> {
        constants.validate()?;

        if setups.is_empty() {
            return Err(DriveError::NoMotors);
        }

        let mut seen = HashSet::new();
        for channel in setups.iter().filter_map(|s| s.encoder) {
            if !seen.insert(channel) {
                return Err(DriveError::DuplicateEncoderChannel(channel));
            }
        }

        let loc = LocalizationEncoder::new(&setups, &constants)?;

        Ok(Self {
            hw,
            demand: vec![0.0; setups.len()],
            enc: Vec::new(),
            setups,
            constants,
            begun: false,
            loc,
        })
    }

    /// Initialise the hardware.
    ///
    /// Checks the configured layout against what the hardware provides,
    /// seeds the encoder history and writes a zero demand to every motor.
    pub fn begin(&mut self) -> Result<(), DriveError> {
        let hw_motors = self.hw.num_motors();
        if hw_motors != self.setups.len() {
            return Err(DriveError::MotorCountMismatch {
                configured: self.setups.len(),
                hardware: hw_motors
            });
        }

        let hw_encoders = self.hw.num_encoders();
        for setup in self.setups.iter() {
            if let Some(channel) = setup.encoder {
                if channel >= hw_encoders {
                    return Err(DriveError::EncoderChannelOutOfRange {
                        motor: Some(setup.name.clone()),
                        channel,
                        available: hw_encoders
                    });
                }
            }
        }

        self.hw.begin()?;

        self.enc = self.poll_encoders()?;
        self.loc.update_position(&self.enc, None)?;

        self.begun = true;
        self.demand.iter_mut().for_each(|d| *d = 0.0);
        self.write()?;

        info!(
            "Drive started with {} motors and {} encoders", 
            hw_motors, hw_encoders
        );

        Ok(())
    }

    pub fn is_begun(&self) -> bool {
        self.begun
    }

    /// Queue a raw demand for every motor.
    ///
    /// Values are clamped to [-1, 1] and non-finite values become zero.
    pub fn set(&mut self, command: &[f64]) -> Result<(), DriveError> {
        self.check_begun()?;

        if command.len() != self.demand.len() {
            return Err(DriveError::CommandLength {
                expected: self.demand.len(),
                found: command.len()
            });
        }

        for (d, c) in self.demand.iter_mut().zip(command.iter()) {
            *d = sanitise_duty(*c);
        }

        trace!("Motor demands: {:?}", self.demand);

        Ok(())
    }

    /// Queue a raw demand for a single motor.
    pub fn set_index(&mut self, value: f64, index: usize) -> Result<(), DriveError> {
        self.check_begun()?;

        match self.demand.get_mut(index) {
            Some(d) => {
                *d = sanitise_duty(value);
                Ok(())
            },
            None => Err(DriveError::MotorIndexOutOfRange {
                index,
                num_motors: self.setups.len()
            })
        }
    }

    /// Push the queued demands to the hardware, applying motor inversion.
    pub fn write(&mut self) -> Result<(), DriveError> {
        self.check_begun()?;

        let duty: Vec<f64> = self.demand
            .iter()
            .zip(self.setups.iter())
            .map(|(d, s)| d * s.direction())
            .collect();

        self.hw.write(&duty)?;

        Ok(())
    }

    /// Read a single encoder channel from the hardware.
    ///
    /// Updates the snapshot for that channel but does not advance the
    /// localisation.
    pub fn read_enc(&mut self, channel: usize) -> Result<i32, DriveError> {
        self.check_begun()?;

        if channel >= self.enc.len() {
            return Err(DriveError::EncoderChannelOutOfRange {
                motor: None,
                channel,
                available: self.enc.len()
            });
        }

        let ticks = self.hw.read(channel)?;
        self.enc[channel] = ticks;

        Ok(ticks)
    }

    /// Read every encoder and advance the localisation.
    ///
    /// ## Arguments
    /// - `yaw` - Optional gyro yaw in radians, fused into the heading.
    ///
    /// If any read fails the previous snapshot and pose are kept and the
    /// error is returned.
    pub fn read_all(&mut self, yaw: Option<f64>) -> Result<Pose2D, DriveError> {
        self.check_begun()?;

        let ticks = match self.poll_encoders() {
            Ok(t) => t,
            Err(e) => {
                warn!("Encoder read failed, holding last pose: {}", e);
                return Err(e);
            }
        };

        let pose = self.loc.update_position(&ticks, yaw)?;
        self.enc = ticks;

        Ok(pose)
    }

    /// Last value read from an encoder channel, without polling.
    pub fn get_enc(&self, channel: usize) -> Result<i32, DriveError> {
        self.enc
            .get(channel)
            .copied()
            .ok_or(DriveError::EncoderChannelOutOfRange {
                motor: None,
                channel,
                available: self.enc.len()
            })
    }

    /// Snapshot of all last-read encoder values.
    pub fn encoders(&self) -> &[i32] {
        &self.enc
    }

    /// The currently queued logical demands.
    pub fn demand(&self) -> &[f64] {
        &self.demand
    }

    pub fn position(&self) -> Pose2D {
        self.loc.position()
    }

    /// Overwrite the localisation pose, for example at the start of an
    /// autonomous routine.
    pub fn set_position(&mut self, pose: Pose2D) {
        debug!("Localisation re-seeded to {}", pose);
        self.loc.set_position(pose);
    }

    pub fn info(&self) -> DriveInfo {
        DriveInfo {
            begun: self.begun,
            pose: self.loc.position(),
            motors: self.setups
                .iter()
                .zip(self.demand.iter())
                .map(|(s, d)| MotorInfo {
                    name: s.name.clone(),
                    demand: *d,
                    inverted: s.inverted,
                    encoder_ticks: s.encoder.and_then(|c| self.enc.get(c).copied())
                })
                .collect()
        }
    }

    pub fn local_info(&self) -> LocalInfo {
        self.loc.info()
    }

    pub fn constants(&self) -> &MotorConstants {
        &self.constants
    }

    pub fn setups(&self) -> &[MotorSetup] {
        &self.setups
    }

    pub fn num_motors(&self) -> usize {
        self.setups.len()
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    fn check_begun(&self) -> Result<(), DriveError> {
        match self.begun {
            true => Ok(()),
            false => Err(DriveError::NotBegun)
        }
    }

    fn poll_encoders(&mut self) -> Result<Vec<i32>, DriveError> {
        let num = self.hw.num_encoders();
        let mut ticks = Vec::with_capacity(num);

        for channel in 0..num {
            ticks.push(self.hw.read(channel)?);
        }

        Ok(ticks)
    }
}

impl<H: DriveHardware> PoseProvider for SimpleDrive<H> {
    fn pose(&self) -> Pose2D {
        self.position()
    }
}

fn sanitise_duty(value: f64) -> f64 {
    if value.is_finite() {
        clamp(value, -1.0, 1.0)
    }
    else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimChassis;
    use crate::test_support::{three_wheel_constants, three_wheel_setups, sim_drive};

    #[test]
    fn test_not_begun() {
        let constants = three_wheel_constants();
        let setups = three_wheel_setups();
        let sim = SimChassis::new(&setups, &constants).unwrap();
        let mut drive = SimpleDrive::new(sim, setups, constants).unwrap();

        assert!(matches!(drive.set(&[0.0, 0.0, 0.0]), Err(DriveError::NotBegun)));
        assert!(matches!(drive.write(), Err(DriveError::NotBegun)));
        assert!(matches!(drive.read_all(None), Err(DriveError::NotBegun)));
    }

    #[test]
    fn test_motor_count_mismatch() {
        let constants = three_wheel_constants();
        let setups = three_wheel_setups();
        let sim = SimChassis::new(&setups[..2], &constants).unwrap();
        let mut drive = SimpleDrive::new(sim, setups, constants).unwrap();

        assert!(matches!(
            drive.begin(),
            Err(DriveError::MotorCountMismatch { configured: 3, hardware: 2 })
        ));
        assert!(!drive.is_begun());
    }

    #[test]
    fn test_encoder_channel_out_of_range() {
        let constants = three_wheel_constants();
        let sim = SimChassis::new(&three_wheel_setups(), &constants).unwrap();

        // The chassis only provides channels 0 to 2
        let mut setups = three_wheel_setups();
        setups[1].encoder = Some(5);
        let mut drive = SimpleDrive::new(sim, setups, constants).unwrap();

        match drive.begin() {
            Err(DriveError::EncoderChannelOutOfRange { motor, channel, available }) => {
                assert_eq!(motor.as_deref(), Some("back"));
                assert_eq!(channel, 5);
                assert_eq!(available, 3);
            },
            other => panic!("Unexpected begin result: {:?}", other)
        }
        assert!(!drive.is_begun());
        assert!(matches!(drive.write(), Err(DriveError::NotBegun)));
    }

    #[test]
    fn test_duplicate_encoder() {
        let mut setups = three_wheel_setups();
        setups[1].encoder = Some(0);
        let sim = SimChassis::new(&setups, &three_wheel_constants()).unwrap();

        assert!(matches!(
            SimpleDrive::new(sim, setups, three_wheel_constants()),
            Err(DriveError::DuplicateEncoderChannel(0))
        ));
    }

    #[test]
    fn test_set_clamps_and_inverts() {
        let mut setups = three_wheel_setups();
        setups[2].inverted = true;
        let mut drive = sim_drive(setups);

        drive.set(&[2.0, f64::NAN, 0.5]).unwrap();
        assert_eq!(drive.demand(), &[1.0, 0.0, 0.5]);

        drive.write().unwrap();
        assert_eq!(drive.hardware().duty(), &[1.0, 0.0, -0.5]);

        assert!(matches!(
            drive.set(&[0.0]),
            Err(DriveError::CommandLength { expected: 3, found: 1 })
        ));
        assert!(matches!(
            drive.set_index(0.1, 7),
            Err(DriveError::MotorIndexOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn test_read_failure_holds_pose() {
        let mut drive = sim_drive(three_wheel_setups());

        drive.set(&[0.5, 0.0, 0.5]).unwrap();
        drive.write().unwrap();
        drive.hardware_mut().advance(0.2);
        drive.read_all(None).unwrap();

        let pose = drive.position();
        let ticks = drive.encoders().to_vec();
        assert!(pose.x > 0.0);

        drive.hardware_mut().advance(0.2);
        drive.hardware_mut().set_fail_reads(true);

        assert!(matches!(drive.read_all(None), Err(DriveError::Hw(_))));
        assert_eq!(drive.position(), pose);
        assert_eq!(drive.encoders(), &ticks[..]);

        drive.hardware_mut().set_fail_reads(false);
        assert!(drive.read_all(None).unwrap().x > pose.x);
    }

    #[test]
    fn test_get_enc_does_not_poll() {
        let mut drive = sim_drive(three_wheel_setups());

        drive.set(&[0.5, 0.0, 0.5]).unwrap();
        drive.write().unwrap();
        drive.hardware_mut().advance(0.2);

        let before = drive.get_enc(0).unwrap();
        let polled = drive.read_enc(0).unwrap();

        assert_ne!(before, polled);
        assert_eq!(drive.get_enc(0).unwrap(), polled);
        assert!(drive.get_enc(9).is_err());
    }

    #[test]
    fn test_info_snapshot() {
        let mut drive = sim_drive(three_wheel_setups());
        drive.set_position(Pose2D::new(1.0, 2.0, 0.0));

        let info = drive.info();

        assert!(info.begun);
        assert_eq!(info.motors.len(), 3);
        assert_eq!(info.motors[0].name, "left");
        assert_eq!(info.pose, Pose2D::new(1.0, 2.0, 0.0));
        assert_eq!(drive.local_info().wheel_distances_in.len(), 3);
    }
}
