//! # Drive Library
//!
//! Control of a holonomic ("vector") drivetrain built from any number of
//! omni wheels at fixed positions and angles on the chassis.
//!
//! The library is layered, each layer owning the one below it:
//!
//! - `simple_drive`: per-motor duty commands, encoder reads and
//!   localisation.
//! - `vec_drive`: body frame velocity commands, limited by the chassis'
//!   speed and acceleration constraints, mapped onto the wheels.
//! - `pid_drive`: closed loop position and velocity holding.
//! - `paths`: waypoint sequencing on top of `pid_drive`.
//!
//! Hardware is reached only through the traits in `hw`, with `sim`
//! providing a kinematic chassis for the executable and the tests.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod data_store;
pub mod hw;
pub mod loc;
pub mod params;
pub mod paths;
pub mod pid;
pub mod pid_drive;
pub mod pose;
pub mod sim;
pub mod simple_drive;
pub mod vec_drive;

#[cfg(test)]
mod test_support;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest cycle time accepted by the rate limited parts of the library.
/// Shorter (or non-finite) time steps are rejected and the previous output
/// is kept.
///
/// Units: seconds
pub const MIN_DT_S: f64 = 1e-3;
