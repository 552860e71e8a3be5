//! Top level drive parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::{
    pid_drive::PidDriveParams,
    simple_drive::{MotorConstants, MotorSetup}
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything needed to build the drive, loaded from `drive.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveParams {
    /// Physical constants of the robot.
    pub constants: MotorConstants,

    /// Motor layout, in hardware channel order.
    pub motors: Vec<MotorSetup>,

    /// Closed-loop controller tuning.
    pub pid: PidDriveParams,
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_shipped_params_load() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../params/drive.toml");

        let params: DriveParams = util::params::load_path(path).unwrap();

        assert_eq!(params.motors.len(), 3);
        assert!(params.constants.validate().is_ok());
        assert!(params.pid.validate().is_ok());
        assert!(params.pid.heading.wrap_error);
    }
}
