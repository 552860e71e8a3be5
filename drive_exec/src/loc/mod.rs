//! # Localisation module
//!
//! Dead-reckoning from the drive encoders, optionally fused with a gyro yaw.
//!
//! Each encoder-equipped wheel measures the body motion projected onto its
//! drive axis, which is exactly the inverse kinematic model used to command
//! the wheels. Stacking those rows gives a matrix `A` with `d = A b`, where
//! `d` holds the wheel travels and `b` the body displacement. The body
//! displacement is then recovered with the pseudo-inverse of `A`, which is
//! the least-squares estimate when more wheels than degrees of freedom are
//! fitted.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod encoder;

pub use encoder::Encoder;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use nalgebra::{DMatrix, DVector, Rotation2, Vector2};
use serde::Serialize;

// Internal
use crate::pose::{Pose2D, Velocity2D};
use crate::simple_drive::{DriveError, MotorConstants, MotorSetup};
use util::maths::ang_diff;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Singular values below this are treated as zero when inverting the wheel
/// geometry.
const GEOMETRY_EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose estimate maintained from encoder deltas.
#[derive(Debug, Clone)]
pub struct LocalizationEncoder {
    pose: Pose2D,

    wheels: Vec<TrackedWheel>,

    /// Pseudo-inverse of the wheel geometry, 3 x number of tracked wheels.
    forward_kinematics: DMatrix<f64>,

    /// Whether heading is observable from the encoders alone.
    heading_observable: bool,

    prev_yaw: Option<f64>,

    /// Body frame displacement from the last update.
    last_body_delta: Velocity2D,
}

#[derive(Debug, Clone)]
struct TrackedWheel {
    channel: usize,
    direction: f64,
    encoder: Encoder,
}

/// Snapshot of the localisation state, replaces the old text dump.
#[derive(Debug, Clone, Serialize)]
pub struct LocalInfo {
    pub pose: Pose2D,
    pub wheel_distances_in: Vec<f64>,
    pub last_body_delta: Velocity2D,
    pub gyro_fused: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocalizationEncoder {
    /// Build the estimator for the given motor layout.
    ///
    /// Fails if no motor has an encoder, or if the encoder-equipped wheels
    /// cannot observe both translational axes.
    pub fn new(setups: &[MotorSetup], constants: &MotorConstants) -> Result<Self, DriveError> {
        let tracked: Vec<&MotorSetup> = setups.iter().filter(|s| s.encoder.is_some()).collect();

        if tracked.is_empty() {
            return Err(DriveError::Geometry("no motor has an encoder".into()));
        }

        let rows: Vec<f64> = tracked.iter().flat_map(|s| s.kinematic_row().to_vec()).collect();
        let geometry = DMatrix::from_row_slice(tracked.len(), 3, &rows);

        let rank = geometry.rank(GEOMETRY_EPS);
        if rank < 2 {
            return Err(DriveError::Geometry(format!(
                "encoder wheel geometry has rank {}, at least 2 is needed",
                rank
            )));
        }
        let heading_observable = rank == 3;
        if !heading_observable {
            warn!("Heading is not observable from the encoders, a gyro yaw must be supplied");
        }

        let forward_kinematics = geometry
            .pseudo_inverse(GEOMETRY_EPS)
            .map_err(|e| DriveError::Geometry(e.to_string()))?;

        let wheels = tracked
            .iter()
            .filter_map(|s| {
                s.encoder.map(|channel| TrackedWheel {
                    channel,
                    direction: s.direction(),
                    encoder: Encoder::new(constants.in_per_tick()),
                })
            })
            .collect();

        Ok(Self {
            pose: Pose2D::default(),
            wheels,
            forward_kinematics,
            heading_observable,
            prev_yaw: None,
            last_body_delta: Velocity2D::ZERO,
        })
    }

    /// Update the pose from a fresh snapshot of raw encoder counts.
    ///
    /// ## Arguments
    /// - `ticks` - Raw counts indexed by encoder channel.
    /// - `yaw` - Optional gyro yaw in radians. When given, the heading change
    ///   comes from the gyro rather than the encoders.
    ///
    /// Nothing is modified if the inputs are rejected.
    pub fn update_position(&mut self, ticks: &[i32], yaw: Option<f64>) -> Result<Pose2D, DriveError> {
        if let Some(y) = yaw {
            if !y.is_finite() {
                return Err(DriveError::InvalidHeading(y));
            }
        }
        for w in self.wheels.iter() {
            if w.channel >= ticks.len() {
                return Err(DriveError::EncoderChannelOutOfRange {
                    motor: None,
                    channel: w.channel,
                    available: ticks.len(),
                });
            }
        }

        let travel = DVector::from_iterator(
            self.wheels.len(),
            self.wheels
                .iter_mut()
                .map(|w| w.direction * w.encoder.update(ticks[w.channel])),
        );

        let body = &self.forward_kinematics * travel;

        let dheading = match yaw {
            Some(y) => {
                let d = self.prev_yaw.map(|p| ang_diff(y, p)).unwrap_or(0.0);
                self.prev_yaw = Some(y);
                d
            }
            None if self.heading_observable => body[2],
            None => 0.0,
        };

        // Integrate using the heading half way through the step
        let mid_heading = self.pose.heading() + 0.5 * dheading;
        let field = Rotation2::new(mid_heading) * Vector2::new(body[0], body[1]);

        self.last_body_delta = Velocity2D::new(body[0], body[1], dheading);
        self.pose = self.pose.translate(field.x, field.y, dheading);

        trace!("Localisation update: {}", self.pose);

        Ok(self.pose)
    }

    /// Current pose estimate.
    pub fn position(&self) -> Pose2D {
        self.pose
    }

    /// Re-seed the pose, encoder and gyro history are kept.
    pub fn set_position(&mut self, pose: Pose2D) {
        self.pose = pose;
    }

    pub fn info(&self) -> LocalInfo {
        LocalInfo {
            pose: self.pose,
            wheel_distances_in: self.wheels.iter().map(|w| w.encoder.distance_in()).collect(),
            last_body_delta: self.last_body_delta,
            gyro_fused: self.prev_yaw.is_some(),
        }
    }
}
