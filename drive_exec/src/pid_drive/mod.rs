//! # Closed-loop drive module
//!
//! Position and velocity hold on top of the open-loop
//! [`crate::vec_drive::VectorDrive`].
//!
//! In position hold one PID per field axis (X, Y and heading) acts on the
//! error between the target and the localised pose. The summed field frame
//! correction is rotated into the body frame and commanded as a velocity.
//!
//! In velocity hold one PID per body axis acts on the error between the
//! target velocity and the last commanded velocity, and the correction is
//! added to the commanded velocity.
//!
//! The controller never decides by itself that a target has been reached,
//! callers query [`PidDrive::is_at_target`] with their own tolerance.

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
