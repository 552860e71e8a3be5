//! # Data Store
//!
//! Per-cycle data of the drive executable, and its CSV archive.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::{
    paths::PathStatus,
    pid_drive::{OutputData, StatusReport},
    pose::Pose2D
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    session::Session
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    // Control
    pub output: Option<OutputData>,
    pub report: StatusReport,
    pub path_status: Option<PathStatus>,

    /// Duty written to each motor this cycle, hardware sense.
    pub motor_duty: Vec<f64>,

    // Simulation
    pub true_pose: Option<Pose2D>,

    arch_cycle: Option<Archiver>,
}

/// One row of the cycle archive.
///
/// CSV rows must be flat, so nested types are unpacked here.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub cycle: u64,
    pub time_s: f64,
    pub mode: String,
    pub waypoint: Option<usize>,
    pub x_in: f64,
    pub y_in: f64,
    pub heading_rad: f64,
    pub true_x_in: Option<f64>,
    pub true_y_in: Option<f64>,
    pub true_heading_rad: Option<f64>,
    pub cmd_vx_ins: f64,
    pub cmd_vy_ins: f64,
    pub cmd_omega_rads: f64,
    pub speed_limited: bool,
    pub accel_limited: bool,
    pub omega_limited: bool,
    pub alpha_limited: bool,
    pub duty_rescaled: bool,
    pub integral_reset: bool,
    pub pose_held: bool,
    pub motor_duty: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create a data store which archives every cycle into the session.
    pub fn with_archive(session: &Session) -> Result<Self, ArchiveError> {
        Ok(Self {
            arch_cycle: Some(Archiver::from_path(session, "drive/cycle.csv")?),
            ..Self::default()
        })
    }

    /// Clear items that are only valid for a single cycle.
    pub fn cycle_start(&mut self) {
        self.output = None;
        self.report = StatusReport::default();
        self.motor_duty.clear();
    }

    /// Finish the cycle, advancing the counters.
    pub fn cycle_end(&mut self, dt: f64) {
        self.num_cycles += 1;
        self.sim_time_s += dt;
    }

    /// Flatten this cycle's data into an archive row.
    ///
    /// Returns `None` if the drive produced no output this cycle.
    pub fn record(&self) -> Option<CycleRecord> {
        let output = self.output?;
        let limits = self.report.drive.limits;

        Some(CycleRecord {
            cycle: self.num_cycles,
            time_s: self.sim_time_s,
            mode: format!("{:?}", output.mode),
            waypoint: match self.path_status {
                Some(PathStatus::InProgress { index }) => Some(index),
                _ => None
            },
            x_in: output.pose.x,
            y_in: output.pose.y,
            heading_rad: output.pose.heading(),
            true_x_in: self.true_pose.map(|p| p.x),
            true_y_in: self.true_pose.map(|p| p.y),
            true_heading_rad: self.true_pose.map(|p| p.heading()),
            cmd_vx_ins: output.command.vx,
            cmd_vy_ins: output.command.vy,
            cmd_omega_rads: output.command.omega,
            speed_limited: limits.speed_limited,
            accel_limited: limits.accel_limited,
            omega_limited: limits.omega_limited,
            alpha_limited: limits.alpha_limited,
            duty_rescaled: self.report.drive.duty_rescaled,
            integral_reset: self.report.integral_reset,
            pose_held: self.report.pose_held,
            motor_duty: self.motor_duty
                .iter()
                .map(|d| format!("{:.4}", d))
                .collect::<Vec<_>>()
                .join(" "),
        })
    }
}

impl Archived for DataStore {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let record = match self.record() {
            Some(r) => r,
            None => return Ok(())
        };

        match self.arch_cycle {
            Some(ref mut a) => a.serialise(record),
            None => Ok(())
        }
    }
}
