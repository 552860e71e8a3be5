//! # Hardware capability interfaces
//!
//! The drive layers talk to the motors and encoders only through these
//! traits, so the same control code runs against the real motor boards or the
//! simulated chassis in [`crate::sim`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::pose::Pose2D;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something that can drive a fixed set of motors.
pub trait MotorActuator {
    /// The number of motor channels provided by the hardware.
    fn num_motors(&self) -> usize;

    /// Initialise the motor hardware.
    fn begin(&mut self) -> Result<(), HwError>;

    /// Push one duty cycle per motor to the hardware.
    ///
    /// ## Arguments
    /// - `duty` - One value per motor in the range [-1, 1]. The caller has
    ///   already applied any inversion, the hardware applies the value as is.
    fn write(&mut self, duty: &[f64]) -> Result<(), HwError>;
}

/// Something that provides raw quadrature counts.
pub trait EncoderSource {
    /// The number of encoder channels provided by the hardware.
    fn num_encoders(&self) -> usize;

    /// Read the raw tick count of one channel.
    ///
    /// Counts are free running and wrap at the `i32` boundary.
    fn read(&mut self, channel: usize) -> Result<i32, HwError>;
}

/// Full drivetrain hardware, motors plus encoders.
pub trait DriveHardware: MotorActuator + EncoderSource {}

impl<T: MotorActuator + EncoderSource> DriveHardware for T {}

/// Provides the current localisation estimate.
pub trait PoseProvider {
    fn pose(&self) -> Pose2D;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors reported by drive hardware.
#[derive(Debug, thiserror::Error)]
pub enum HwError {
    #[error("Hardware initialisation failed: {0}")]
    InitFailed(String),

    #[error("Failed to read encoder channel {channel}: {reason}")]
    ReadFailed {
        channel: usize,
        reason: String
    },

    #[error("Encoder channel {0} does not exist")]
    NoSuchChannel(usize),

    #[error("Failed to write motor demands: {0}")]
    WriteFailed(String),
}
