//! # Pose and velocity value types
//!
//! `Pose2D` is a position and heading in the field frame. `Velocity2D` is the
//! rate counterpart used for every speed demand in the drive. The two are
//! kept separate so that angular rates are never wrapped like headings.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;

// Internal
use util::maths::{ang_diff, clamp_abs, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position and heading in 2D.
///
/// Units: inches for `x` and `y`, radians for `heading`. The heading is kept
/// in (-pi, pi] by every constructor and operation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawPose2D")]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    heading: f64,
}

/// Unnormalised form used when deserialising, so that poses read from files
/// get their heading wrapped.
#[derive(Deserialize)]
struct RawPose2D {
    x: f64,
    y: f64,
    heading: f64,
}

/// A velocity demand or estimate.
///
/// Units: inches/second for `vx` and `vy`, radians/second for `omega`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity2D {
    pub vx: f64,
    pub vy: f64,
    pub omega: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2D {
    /// Create a new pose, the heading is wrapped into (-pi, pi].
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            x,
            y,
            heading: wrap_pi(heading),
        }
    }

    /// Create a pose with the heading given in degrees.
    pub fn from_degrees(x: f64, y: f64, heading_deg: f64) -> Self {
        Self::new(x, y, heading_deg.to_radians())
    }

    /// Heading in radians, in (-pi, pi].
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Return a copy with a different heading.
    pub fn with_heading(&self, heading: f64) -> Self {
        Self::new(self.x, self.y, heading)
    }

    /// Component-wise sum, the heading is re-wrapped.
    pub fn add(&self, other: &Pose2D) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.heading + other.heading)
    }

    /// Component-wise difference `self - other`. The heading component is the
    /// shortest signed angle between the two headings.
    pub fn sub(&self, other: &Pose2D) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            heading: ang_diff(self.heading, other.heading),
        }
    }

    /// Translate by a displacement given in the field frame.
    pub fn translate(&self, dx: f64, dy: f64, dheading: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.heading + dheading)
    }

    /// Rotate the position vector about the origin, the heading is unchanged.
    pub fn rotated(&self, angle: f64) -> Self {
        let v = Rotation2::new(angle) * Vector2::new(self.x, self.y);
        Self {
            x: v.x,
            y: v.y,
            heading: self.heading,
        }
    }

    /// Length of the position vector.
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Straight line distance to another pose.
    pub fn distance_to(&self, other: &Pose2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Shortest signed heading change needed to go from this pose to `other`.
    pub fn heading_error_to(&self, other: &Pose2D) -> f64 {
        ang_diff(other.heading, self.heading)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.heading.is_finite()
    }
}

impl From<RawPose2D> for Pose2D {
    fn from(raw: RawPose2D) -> Self {
        Pose2D::new(raw.x, raw.y, raw.heading)
    }
}

impl fmt::Display for Pose2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pose: ({:.2} in, {:.2} in, {:.1} deg)",
            self.x,
            self.y,
            self.heading.to_degrees()
        )
    }
}

impl Velocity2D {
    pub const ZERO: Velocity2D = Velocity2D {
        vx: 0.0,
        vy: 0.0,
        omega: 0.0,
    };

    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    /// Translational speed.
    pub fn magnitude(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Scale the translational part so its magnitude does not exceed
    /// `max_mag`, keeping its direction.
    pub fn constrain_xy_mag(&self, max_mag: f64) -> Self {
        let mag = self.magnitude();

        if mag > max_mag && mag > 0.0 {
            let k = max_mag.max(0.0) / mag;
            Self {
                vx: self.vx * k,
                vy: self.vy * k,
                omega: self.omega,
            }
        } else {
            *self
        }
    }

    /// Clamp the angular rate into `[-max_omega, max_omega]`.
    pub fn constrain_omega(&self, max_omega: f64) -> Self {
        Self {
            omega: clamp_abs(self.omega, max_omega),
            ..*self
        }
    }

    /// Rotate the translational part, `omega` is unchanged.
    pub fn rotated(&self, angle: f64) -> Self {
        let v = Rotation2::new(angle) * Vector2::new(self.vx, self.vy);
        Self {
            vx: v.x,
            vy: v.y,
            omega: self.omega,
        }
    }

    pub fn scale(&self, k: f64) -> Self {
        Self {
            vx: self.vx * k,
            vy: self.vy * k,
            omega: self.omega * k,
        }
    }

    pub fn add(&self, other: &Velocity2D) -> Self {
        Self {
            vx: self.vx + other.vx,
            vy: self.vy + other.vy,
            omega: self.omega + other.omega,
        }
    }

    pub fn sub(&self, other: &Velocity2D) -> Self {
        self.add(&other.scale(-1.0))
    }

    pub fn is_finite(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite() && self.omega.is_finite()
    }

    /// Replace any non-finite component with zero.
    pub fn sanitised(&self) -> Self {
        let f = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            vx: f(self.vx),
            vy: f(self.vy),
            omega: f(self.omega),
        }
    }
}

impl fmt::Display for Velocity2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Velocity: ({:.2} in/s, {:.2} in/s, {:.3} rad/s)",
            self.vx, self.vy, self.omega
        )
    }
}
