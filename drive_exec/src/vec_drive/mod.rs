//! # Vector drive module
//!
//! Open-loop holonomic control. A body frame velocity request is rate
//! limited against the robot's capabilities, resolved into per-motor duties
//! and queued on the underlying [`crate::simple_drive::SimpleDrive`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_rc_vector;
mod calc_teleop;
mod constrain;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use calc_rc_vector::*;
pub use calc_teleop::*;
pub use constrain::*;
pub use state::*;
