//! # Waypoint paths
//!
//! Pre-recorded autonomous routines are sequences of field poses stored in a
//! parameter file. A [`PathFollower`] feeds them to a [`PidDrive`] one at a
//! time, moving on once the drive has held each waypoint for a number of
//! consecutive cycles.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Internal
use crate::{
    hw::DriveHardware,
    pid_drive::{PidDrive, Tolerance},
    pose::Pose2D,
    simple_drive::DriveError
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Contents of a paths parameter file.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsFile {
    /// Arrival tolerance applied to every waypoint.
    pub tolerance: Tolerance,

    /// Number of consecutive cycles a waypoint must be held before moving on.
    pub settle_cycles: usize,

    /// Named waypoint sequences.
    pub paths: HashMap<String, Vec<Waypoint>>,
}

/// One waypoint as written in the paths file.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Waypoint {
    /// Units: inches
    pub x_in: f64,

    /// Units: inches
    pub y_in: f64,

    /// Units: degrees
    pub heading_deg: f64,
}

/// Drives a [`PidDrive`] through a sequence of poses.
#[derive(Debug, Clone)]
pub struct PathFollower {
    waypoints: Vec<Pose2D>,
    index: usize,

    tolerance: Tolerance,
    settle_cycles: usize,

    /// Consecutive cycles the current waypoint has been held.
    settled: usize,

    /// Index of the waypoint last handed to the drive.
    commanded: Option<usize>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Progress through a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathStatus {
    /// Heading for waypoint `index`.
    InProgress {
        index: usize
    },

    /// Every waypoint has been reached.
    Finished,
}

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("No path named {0:?} in the paths file")]
    UnknownPath(String),

    #[error("Path {0:?} has no waypoints")]
    EmptyPath(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn to_pose(&self) -> Pose2D {
        Pose2D::from_degrees(self.x_in, self.y_in, self.heading_deg)
    }
}

impl PathsFile {
    /// Get the poses of a named path.
    pub fn path(&self, name: &str) -> Result<Vec<Pose2D>, PathError> {
        let waypoints = self.paths
            .get(name)
            .ok_or_else(|| PathError::UnknownPath(name.into()))?;

        if waypoints.is_empty() {
            return Err(PathError::EmptyPath(name.into()));
        }

        Ok(waypoints.iter().map(Waypoint::to_pose).collect())
    }

    /// Build a follower for a named path.
    pub fn follower(&self, name: &str) -> Result<PathFollower, PathError> {
        Ok(PathFollower::new(self.path(name)?, self.tolerance, self.settle_cycles))
    }
}

impl PathFollower {
    pub fn new(waypoints: Vec<Pose2D>, tolerance: Tolerance, settle_cycles: usize) -> Self {
        Self {
            waypoints,
            index: 0,
            tolerance,
            settle_cycles,
            settled: 0,
            commanded: None,
        }
    }

    pub fn add_waypoint(&mut self, pose: Pose2D) {
        self.waypoints.push(pose);
    }

    pub fn add_waypoints(&mut self, poses: &[Pose2D]) {
        self.waypoints.extend_from_slice(poses);
    }

    /// Remove every waypoint and start over.
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.index = 0;
        self.settled = 0;
        self.commanded = None;
    }

    /// Abandon the current waypoint.
    pub fn skip_to_next(&mut self) {
        if self.index < self.waypoints.len() {
            debug!("Skipping waypoint {}", self.index);
            self.index += 1;
            self.settled = 0;
        }
    }

    /// The waypoint currently being driven to.
    pub fn current_target(&self) -> Option<Pose2D> {
        self.waypoints.get(self.index).copied()
    }

    pub fn status(&self) -> PathStatus {
        match self.index < self.waypoints.len() {
            true => PathStatus::InProgress { index: self.index },
            false => PathStatus::Finished
        }
    }

    /// Advance the follower by one cycle.
    ///
    /// Hands the current waypoint to the drive when it changes and checks
    /// for arrival. After the last waypoint the drive is left holding it.
    pub fn proc<H: DriveHardware>(
        &mut self, 
        drive: &mut PidDrive<H>
    ) -> Result<PathStatus, DriveError> {
        let target = match self.current_target() {
            Some(t) => t,
            None => return Ok(PathStatus::Finished)
        };

        if self.commanded != Some(self.index) {
            drive.set_target(target)?;
            self.commanded = Some(self.index);
            self.settled = 0;
            return Ok(self.status());
        }

        if drive.is_at_target(&self.tolerance) {
            self.settled += 1;
        }
        else {
            self.settled = 0;
        }

        if self.settled >= self.settle_cycles {
            info!(
                "Waypoint {} of {} reached at {}", 
                self.index + 1, 
                self.waypoints.len(), 
                drive.position()
            );
            self.index += 1;
            self.settled = 0;

            if let Some(next) = self.current_target() {
                drive.set_target(next)?;
                self.commanded = Some(self.index);
            }
        }

        Ok(self.status())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{pid_drive_params, sim_pid_drive};

    const DT: f64 = 0.02;

    const PATHS_TOML: &str = r#"
settle_cycles = 5

[tolerance]
position_in = 0.5
heading_rad = 0.05
velocity_ins = 0.5
omega_rads = 0.05

[paths]
empty = []

[[paths.square]]
x_in = 0.0
y_in = 0.0
heading_deg = 0.0

[[paths.square]]
x_in = 6.0
y_in = 0.0
heading_deg = 0.0

[[paths.square]]
x_in = 6.0
y_in = 6.0
heading_deg = 0.0
"#;

    fn tolerance() -> Tolerance {
        Tolerance {
            position_in: 0.5,
            heading_rad: 0.05,
            velocity_ins: 0.5,
            omega_rads: 0.05,
        }
    }

    #[test]
    fn test_load_paths() {
        let file: PathsFile = util::params::from_str(PATHS_TOML).unwrap();

        let square = file.path("square").unwrap();
        assert_eq!(square.len(), 3);
        assert_eq!(square[2], Pose2D::new(6.0, 6.0, 0.0));

        assert!(matches!(file.path("missing"), Err(PathError::UnknownPath(_))));
        assert!(matches!(file.path("empty"), Err(PathError::EmptyPath(_))));
    }

    #[test]
    fn test_shipped_paths_load() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../params/paths.toml");
        let file: PathsFile = util::params::load_path(path).unwrap();

        let route = file.path("start_to_slam_sw90").unwrap();
        assert_eq!(route.len(), 7);
        assert_eq!(route[0], Pose2D::from_degrees(31.5, 6.0, 90.0));
        assert!(file.follower("jostle_beacon").is_ok());
    }

    #[test]
    fn test_follow_square() {
        let file: PathsFile = util::params::from_str(PATHS_TOML).unwrap();
        let mut follower = file.follower("square").unwrap();
        let mut drive = sim_pid_drive(pid_drive_params());

        let mut finished_at = None;
        for i in 0..1500 {
            drive.update(None).unwrap();
            if follower.proc(&mut drive).unwrap() == PathStatus::Finished {
                finished_at = Some(i);
                break;
            }
            drive.step(DT).unwrap();
            drive.write().unwrap();
            drive.hardware_mut().advance(DT);
        }

        assert!(finished_at.is_some());
        let pose = drive.position();
        assert!(pose.distance_to(&Pose2D::new(6.0, 6.0, 0.0)) <= 0.5);
    }

    #[test]
    fn test_skip_and_clear() {
        let mut follower = PathFollower::new(
            vec![Pose2D::new(1.0, 0.0, 0.0), Pose2D::new(2.0, 0.0, 0.0)],
            tolerance(),
            3
        );

        assert_eq!(follower.status(), PathStatus::InProgress { index: 0 });
        follower.skip_to_next();
        assert_eq!(follower.current_target(), Some(Pose2D::new(2.0, 0.0, 0.0)));
        follower.skip_to_next();
        follower.skip_to_next();
        assert_eq!(follower.status(), PathStatus::Finished);

        follower.clear();
        assert_eq!(follower.status(), PathStatus::Finished);
        follower.add_waypoints(&[Pose2D::new(3.0, 0.0, 0.0)]);
        assert_eq!(follower.status(), PathStatus::InProgress { index: 0 });

        follower.add_waypoint(Pose2D::new(4.0, 1.0, 0.0));
        follower.skip_to_next();
        assert_eq!(follower.current_target(), Some(Pose2D::new(4.0, 1.0, 0.0)));
    }

    #[test]
    fn test_waits_for_settle() {
        let mut drive = sim_pid_drive(pid_drive_params());
        let mut follower = PathFollower::new(
            vec![Pose2D::default(), Pose2D::new(5.0, 0.0, 0.0)],
            tolerance(),
            3
        );

        // Already at the first waypoint: one cycle to command it, three to
        // settle
        for _ in 0..3 {
            assert_eq!(follower.proc(&mut drive).unwrap(), PathStatus::InProgress { index: 0 });
        }
        assert_eq!(follower.proc(&mut drive).unwrap(), PathStatus::InProgress { index: 1 });
        assert_eq!(drive.position_error().unwrap().x, 5.0);
    }
}
