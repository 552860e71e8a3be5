//! Parameters for the closed-loop drive

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::pid::{PidConfig, PidError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Controller tuning for [`super::PidDrive`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PidDriveParams {

    // ---- POSITION HOLD ----

    /// Field X position controller, output in inches/second.
    pub x: PidConfig,

    /// Field Y position controller, output in inches/second.
    pub y: PidConfig,

    /// Heading controller, output in radians/second.
    pub heading: PidConfig,

    // ---- VELOCITY HOLD ----

    /// Body X velocity controller, output in inches/second.
    pub vx: PidConfig,

    /// Body Y velocity controller, output in inches/second.
    pub vy: PidConfig,

    /// Angular velocity controller, output in radians/second.
    pub omega: PidConfig,

    // ---- INTEGRAL RESET ----

    /// A new position target further than this from the previous one resets
    /// the position integrals.
    ///
    /// Units: inches
    #[serde(default = "PidDriveParams::default_reset_threshold_in")]
    pub reset_threshold_in: f64,

    /// A new heading target differing by more than this resets the position
    /// integrals.
    ///
    /// Units: radians
    #[serde(default = "PidDriveParams::default_reset_threshold_rad")]
    pub reset_threshold_rad: f64,

    /// A new velocity target differing by more than this resets the velocity
    /// integrals.
    ///
    /// Units: inches/second
    #[serde(default = "PidDriveParams::default_reset_threshold_ins")]
    pub reset_threshold_ins: f64,

    /// A new angular velocity target differing by more than this resets the
    /// velocity integrals.
    ///
    /// Units: radians/second
    #[serde(default = "PidDriveParams::default_reset_threshold_rads")]
    pub reset_threshold_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidDriveParams {
    fn default_reset_threshold_in() -> f64 {
        1.0
    }

    fn default_reset_threshold_rad() -> f64 {
        0.1
    }

    fn default_reset_threshold_ins() -> f64 {
        2.0
    }

    fn default_reset_threshold_rads() -> f64 {
        0.2
    }

    pub fn validate(&self) -> Result<(), PidError> {
        for c in [self.x, self.y, self.heading, self.vx, self.vy, self.omega].iter() {
            c.validate()?;
        }

        let thresholds = [
            self.reset_threshold_in, 
            self.reset_threshold_rad,
            self.reset_threshold_ins,
            self.reset_threshold_rads
        ];
        if thresholds.iter().any(|t| !(t.is_finite() && *t >= 0.0)) {
            return Err(PidError::InvalidConfig(
                "integral reset thresholds must be finite and not negative".into()
            ));
        }

        Ok(())
    }
}
