//! # Simple drive module
//!
//! Hardware facing layer of the drivetrain. Owns the motor and encoder
//! hardware, queues raw per-motor duty demands, snapshots encoder counts and
//! keeps the localisation estimate up to date.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

use crate::{hw::HwError, pid::PidError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the drive layers.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Invalid motor constants: {0}")]
    InvalidConstants(String),

    #[error("No motors have been configured")]
    NoMotors,

    #[error(
        "{configured} motors are configured but the hardware provides {hardware}"
    )]
    MotorCountMismatch {
        configured: usize,
        hardware: usize
    },

    #[error(
        "Encoder channel {channel} (motor {motor:?}) is out of range, {available} \
        channels are available"
    )]
    EncoderChannelOutOfRange {
        motor: Option<String>,
        channel: usize,
        available: usize
    },

    #[error("Encoder channel {0} is assigned to more than one motor")]
    DuplicateEncoderChannel(usize),

    #[error("The drive has not been started, call begin() first")]
    NotBegun,

    #[error("Expected {expected} motor demands but found {found}")]
    CommandLength {
        expected: usize,
        found: usize
    },

    #[error("Motor index {index} is out of range for {num_motors} motors")]
    MotorIndexOutOfRange {
        index: usize,
        num_motors: usize
    },

    #[error("Heading input is not finite: {0}")]
    InvalidHeading(f64),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid drive geometry: {0}")]
    Geometry(String),

    #[error("Hardware error: {0}")]
    Hw(#[from] HwError),

    #[error(transparent)]
    Pid(#[from] PidError),
}
