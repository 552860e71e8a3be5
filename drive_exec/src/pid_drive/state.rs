//! Implementations for the PidDrive state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

// Internal
use super::PidDriveParams;
use crate::{
    hw::{DriveHardware, PoseProvider},
    pid::{Pid, PidConfig, PidSnapshot},
    pose::{Pose2D, Velocity2D},
    simple_drive::DriveError,
    vec_drive::{self, VectorDrive}
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Closed-loop drive over a [`VectorDrive`].
pub struct PidDrive<H: DriveHardware> {
    drive: VectorDrive<H>,

    params: PidDriveParams,

    /// X, Y and heading controllers for position hold.
    position_pids: AxisPids,

    /// VX, VY and omega controllers for velocity hold.
    velocity_pids: AxisPids,

    target: Target,

    /// Set when a target change cleared the integrals, reported on the next
    /// step.
    integral_reset_pending: bool,

    report: StatusReport,
}

/// Acceptable residual errors for [`PidDrive::is_at_target`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Tolerance {
    /// Units: inches
    pub position_in: f64,

    /// Units: radians
    pub heading_rad: f64,

    /// Units: inches/second
    pub velocity_ins: f64,

    /// Units: radians/second
    pub omega_rads: f64,
}

/// Input data to the closed-loop drive.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// Time since the previous cycle.
    ///
    /// Units: seconds
    pub dt: f64,

    /// Gyro yaw for this cycle, if one is fitted.
    ///
    /// Units: radians
    pub yaw: Option<f64>,
}

/// Output of one closed-loop cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutputData {
    pub mode: DriveMode,
    pub pose: Pose2D,

    /// Constrained body frame velocity queued on the motors.
    pub command: Velocity2D,
}

/// Status report for closed-loop processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub drive: vec_drive::StatusReport,

    /// The integrals of the active controllers were cleared by a target
    /// change since the last cycle.
    pub integral_reset: bool,

    /// Localisation could not be updated this cycle and the last pose was
    /// held.
    pub pose_held: bool,
}

/// Serialisable view of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct PidDriveSnapshot {
    pub mode: DriveMode,
    pub pose: Pose2D,
    pub velocity: Velocity2D,
    pub target_pose: Option<Pose2D>,
    pub target_velocity: Option<Velocity2D>,
    pub position_error: Option<Pose2D>,
    pub velocity_error: Option<Velocity2D>,
    pub position_pids: AxisSnapshot,
    pub velocity_pids: AxisSnapshot,
    pub report: StatusReport,
}

/// Internal state of a set of three axis controllers.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AxisSnapshot {
    pub x: PidSnapshot,
    pub y: PidSnapshot,
    pub rotation: PidSnapshot,
}

#[derive(Debug, Clone)]
struct AxisPids {
    x: Pid,
    y: Pid,
    rotation: Pid,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Active control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriveMode {
    Idle,
    PositionHold,
    VelocityHold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    None,
    Pose(Pose2D),
    Velocity(Velocity2D),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<H: DriveHardware> PidDrive<H> {
    /// Create the closed-loop drive, starting idle.
    pub fn new(drive: VectorDrive<H>, params: PidDriveParams) -> Result<Self, DriveError> {
        params.validate()?;

        Ok(Self {
            position_pids: AxisPids::new(params.x, params.y, params.heading)?,
            velocity_pids: AxisPids::new(params.vx, params.vy, params.omega)?,
            drive,
            params,
            target: Target::None,
            integral_reset_pending: false,
            report: StatusReport::default(),
        })
    }

    pub fn begin(&mut self) -> Result<(), DriveError> {
        self.drive.begin()
    }

    pub fn mode(&self) -> DriveMode {
        match self.target {
            Target::None => DriveMode::Idle,
            Target::Pose(_) => DriveMode::PositionHold,
            Target::Velocity(_) => DriveMode::VelocityHold,
        }
    }

    /// Hold a field frame pose. Takes effect on the next [`PidDrive::step`].
    pub fn set_target(&mut self, pose: Pose2D) -> Result<(), DriveError> {
        if !pose.is_finite() {
            return Err(DriveError::InvalidTarget(format!("{}", pose)));
        }

        match self.target {
            Target::Pose(prev) => {
                if prev.distance_to(&pose) > self.params.reset_threshold_in
                    || prev.heading_error_to(&pose).abs() > self.params.reset_threshold_rad
                {
                    self.position_pids.reset_integral();
                    self.integral_reset_pending = true;
                }
            },
            _ => {
                debug!("Drive mode {:?} -> {:?}", self.mode(), DriveMode::PositionHold);
                self.position_pids.reset();
                self.integral_reset_pending = true;
            }
        }

        debug!("New target {}", pose);
        self.target = Target::Pose(pose);

        Ok(())
    }

    /// Hold a body frame velocity. Takes effect on the next
    /// [`PidDrive::step`].
    pub fn set_target_by_velocity(&mut self, velocity: Velocity2D) -> Result<(), DriveError> {
        if !velocity.is_finite() {
            return Err(DriveError::InvalidTarget(format!("{}", velocity)));
        }

        match self.target {
            Target::Velocity(prev) => {
                let delta = velocity.sub(&prev);
                if delta.magnitude() > self.params.reset_threshold_ins
                    || delta.omega.abs() > self.params.reset_threshold_rads
                {
                    self.velocity_pids.reset_integral();
                    self.integral_reset_pending = true;
                }
            },
            _ => {
                debug!("Drive mode {:?} -> {:?}", self.mode(), DriveMode::VelocityHold);
                self.velocity_pids.reset();
                self.integral_reset_pending = true;
            }
        }

        self.target = Target::Velocity(velocity);

        Ok(())
    }

    /// Drop the target and go idle, the next step stops the motors.
    pub fn clear_target(&mut self) {
        if self.target != Target::None {
            debug!("Drive mode {:?} -> {:?}", self.mode(), DriveMode::Idle);
        }
        self.target = Target::None;
    }

    /// Read the sensors and advance the localisation.
    pub fn update(&mut self, yaw: Option<f64>) -> Result<Pose2D, DriveError> {
        self.drive.update(yaw)
    }

    /// Run the controllers for one cycle and queue the resulting command.
    ///
    /// The command only reaches the motors on [`PidDrive::write`].
    pub fn step(&mut self, dt: f64) -> Result<Velocity2D, DriveError> {
        let command = match self.target {
            Target::None => {
                self.drive.stop()?;
                Velocity2D::ZERO
            },
            Target::Pose(target) => {
                let pose = self.drive.position();
                let error = target.sub(&pose);

                // Field frame correction, rotated into the body frame
                let correction = self.position_pids.step(
                    error.x, error.y, error.heading(), dt
                );
                self.drive.set(correction.rotated(-pose.heading()), dt)?
            },
            Target::Velocity(target) => {
                let current = self.drive.get_velocity();
                let error = target.sub(&current);

                let correction = self.velocity_pids.step(
                    error.vx, error.vy, error.omega, dt
                );
                self.drive.set(current.add(&correction), dt)?
            }
        };

        self.report.drive = self.drive.status_report();
        self.report.integral_reset = self.integral_reset_pending;
        self.integral_reset_pending = false;

        trace!("PidDrive {:?} command {}", self.mode(), command);

        Ok(command)
    }

    /// Push the queued command to the motors.
    pub fn write(&mut self) -> Result<(), DriveError> {
        self.drive.write()
    }

    /// Field frame error between the target pose and the current pose, if
    /// holding position.
    pub fn position_error(&self) -> Option<Pose2D> {
        match self.target {
            Target::Pose(target) => Some(target.sub(&self.drive.position())),
            _ => None
        }
    }

    /// Error between the target velocity and the commanded velocity, if
    /// holding velocity.
    pub fn velocity_error(&self) -> Option<Velocity2D> {
        match self.target {
            Target::Velocity(target) => Some(target.sub(&self.drive.get_velocity())),
            _ => None
        }
    }

    /// Whether the active target has been reached within `tol`.
    ///
    /// Always false when idle.
    pub fn is_at_target(&self, tol: &Tolerance) -> bool {
        if let Some(e) = self.position_error() {
            e.magnitude() <= tol.position_in && e.heading().abs() <= tol.heading_rad
        }
        else if let Some(e) = self.velocity_error() {
            e.magnitude() <= tol.velocity_ins && e.omega.abs() <= tol.omega_rads
        }
        else {
            false
        }
    }

    pub fn position(&self) -> Pose2D {
        self.drive.position()
    }

    pub fn set_position(&mut self, pose: Pose2D) {
        self.drive.set_position(pose)
    }

    pub fn get_velocity(&self) -> Velocity2D {
        self.drive.get_velocity()
    }

    pub fn status_report(&self) -> StatusReport {
        self.report
    }

    pub fn vector(&self) -> &VectorDrive<H> {
        &self.drive
    }

    pub fn hardware(&self) -> &H {
        self.drive.simple().hardware()
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        self.drive.simple_mut().hardware_mut()
    }

    pub fn snapshot(&self) -> PidDriveSnapshot {
        let (target_pose, target_velocity) = match self.target {
            Target::None => (None, None),
            Target::Pose(p) => (Some(p), None),
            Target::Velocity(v) => (None, Some(v)),
        };

        PidDriveSnapshot {
            mode: self.mode(),
            pose: self.position(),
            velocity: self.get_velocity(),
            target_pose,
            target_velocity,
            position_error: self.position_error(),
            velocity_error: self.velocity_error(),
            position_pids: self.position_pids.snapshot(),
            velocity_pids: self.velocity_pids.snapshot(),
            report: self.report,
        }
    }
}

impl<H: DriveHardware> PoseProvider for PidDrive<H> {
    fn pose(&self) -> Pose2D {
        self.position()
    }
}

impl<H: DriveHardware> State for PidDrive<H> {
    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DriveError;

    /// Perform one full control cycle: localise, then run the controllers.
    ///
    /// A sensor failure holds the last pose and is flagged in the report
    /// rather than aborting the cycle.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let pose_held = match self.update(input_data.yaw) {
            Ok(_) => false,
            Err(DriveError::NotBegun) => return Err(DriveError::NotBegun),
            Err(e) => {
                warn!("Localisation not updated: {}", e);
                true
            }
        };

        let command = self.step(input_data.dt)?;
        self.report.pose_held = pose_held;

        let output = OutputData {
            mode: self.mode(),
            pose: self.position(),
            command
        };

        Ok((output, self.report))
    }
}

impl AxisPids {
    fn new(x: PidConfig, y: PidConfig, rotation: PidConfig) -> Result<Self, DriveError> {
        Ok(Self {
            x: Pid::new(x)?,
            y: Pid::new(y)?,
            rotation: Pid::new(rotation)?,
        })
    }

    fn step(&mut self, ex: f64, ey: f64, erot: f64, dt: f64) -> Velocity2D {
        Velocity2D::new(
            self.x.step(ex, dt),
            self.y.step(ey, dt),
            self.rotation.step(erot, dt)
        )
    }

    fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.rotation.reset();
    }

    fn reset_integral(&mut self) {
        self.x.reset_integral();
        self.y.reset_integral();
        self.rotation.reset_integral();
    }

    fn snapshot(&self) -> AxisSnapshot {
        AxisSnapshot {
            x: self.x.snapshot(),
            y: self.y.snapshot(),
            rotation: self.rotation.snapshot(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimChassis;
    use crate::test_support::{pid_drive_params, sim_pid_drive};
    use approx::assert_abs_diff_eq;

    const DT: f64 = 0.02;

    fn cycle(drive: &mut PidDrive<SimChassis>) {
        drive.update(None).unwrap();
        drive.step(DT).unwrap();
        drive.write().unwrap();
        drive.hardware_mut().advance(DT);
    }

    #[test]
    fn test_position_hold_scenario() {
        let mut drive = sim_pid_drive(pid_drive_params());
        drive.set_target(Pose2D::new(24.0, 0.0, 0.0)).unwrap();

        let mut max_x = f64::MIN;
        for _ in 0..200 {
            cycle(&mut drive);
            max_x = max_x.max(drive.position().x);
        }

        let error = drive.position_error().unwrap();
        assert!(error.x.abs() < 0.5, "final x error {}", error.x);
        assert!(max_x <= 24.0 * 1.1, "overshoot to {}", max_x);
        assert!(error.y.abs() < 0.1);
        assert!(error.heading().abs() < 0.01);

        let pid = drive.snapshot().position_pids.x;
        assert!(pid.integral.abs() <= 0.5);
    }

    #[test]
    fn test_velocity_hold_scenario() {
        let mut params = pid_drive_params();
        params.vx.k_i = 0.0;
        let mut drive = sim_pid_drive(params);
        drive.set_target_by_velocity(Velocity2D::new(10.0, 0.0, 0.0)).unwrap();

        for _ in 0..50 {
            cycle(&mut drive);
        }

        let v = drive.get_velocity();
        assert_abs_diff_eq!(v.vx, 10.0, epsilon = 0.05);
        assert_abs_diff_eq!(v.vy, 0.0, epsilon = 0.05);
        assert_abs_diff_eq!(v.omega, 0.0, epsilon = 0.01);

        let tol = Tolerance {
            position_in: 0.0,
            heading_rad: 0.0,
            velocity_ins: 0.05,
            omega_rads: 0.01
        };
        assert!(drive.is_at_target(&tol));
    }

    #[test]
    fn test_stationary_hold_is_quiet() {
        let mut drive = sim_pid_drive(pid_drive_params());
        drive.set_target(drive.position()).unwrap();

        for _ in 0..100 {
            cycle(&mut drive);
        }

        assert_eq!(drive.get_velocity(), Velocity2D::ZERO);
        assert!(drive.hardware().duty().iter().all(|d| *d == 0.0));
        assert_eq!(drive.position(), Pose2D::default());
    }

    #[test]
    fn test_heading_error_wraps() {
        let mut drive = sim_pid_drive(pid_drive_params());
        drive.set_position(Pose2D::from_degrees(0.0, 0.0, 170.0));
        drive.set_target(Pose2D::from_degrees(0.0, 0.0, -170.0)).unwrap();

        let err = drive.position_error().unwrap();
        assert_abs_diff_eq!(err.heading(), 20f64.to_radians(), epsilon = 1e-9);

        drive.step(DT).unwrap();
        assert!(drive.get_velocity().omega > 0.0);
    }

    #[test]
    fn test_integral_bounded_under_sustained_error() {
        let mut drive = sim_pid_drive(pid_drive_params());
        drive.set_target(Pose2D::new(1000.0, 0.0, 0.0)).unwrap();

        for _ in 0..500 {
            cycle(&mut drive);
            let x = drive.snapshot().position_pids.x;
            assert!(x.integral.abs() <= 0.5 + 1e-12);
        }
        assert!(drive.position_error().unwrap().x > 100.0);
    }

    #[test]
    fn test_integral_reset_policy() {
        let mut drive = sim_pid_drive(pid_drive_params());
        drive.set_target(Pose2D::new(10.0, 0.0, 0.0)).unwrap();
        for _ in 0..20 {
            cycle(&mut drive);
        }
        assert!(!drive.status_report().integral_reset);
        let integral = drive.snapshot().position_pids.x.integral;
        assert!(integral > 0.0);

        // Small nudge keeps the integral
        drive.set_target(Pose2D::new(10.5, 0.0, 0.0)).unwrap();
        assert_eq!(drive.snapshot().position_pids.x.integral, integral);

        // Large jump clears it but keeps the derivative history
        drive.set_target(Pose2D::new(30.0, 0.0, 0.0)).unwrap();
        let x = drive.snapshot().position_pids.x;
        assert_eq!(x.integral, 0.0);
        assert!(x.prev_error.is_some());

        cycle(&mut drive);
        assert!(drive.status_report().integral_reset);
        cycle(&mut drive);
        assert!(!drive.status_report().integral_reset);

        // Mode change clears the newly active set
        drive.set_target_by_velocity(Velocity2D::new(5.0, 0.0, 0.0)).unwrap();
        assert_eq!(drive.mode(), DriveMode::VelocityHold);
        assert_eq!(drive.snapshot().velocity_pids.x.prev_error, None);
    }

    #[test]
    fn test_idle_stops() {
        let mut drive = sim_pid_drive(pid_drive_params());
        drive.set_target_by_velocity(Velocity2D::new(8.0, 0.0, 0.5)).unwrap();
        for _ in 0..20 {
            cycle(&mut drive);
        }
        assert!(drive.get_velocity().vx > 0.0);

        drive.clear_target();
        cycle(&mut drive);

        assert_eq!(drive.mode(), DriveMode::Idle);
        assert_eq!(drive.get_velocity(), Velocity2D::ZERO);
        assert!(drive.hardware().duty().iter().all(|d| *d == 0.0));
        assert!(!drive.is_at_target(&Tolerance {
            position_in: 1e9, heading_rad: 1e9, velocity_ins: 1e9, omega_rads: 1e9
        }));
    }

    #[test]
    fn test_invalid_target_rejected() {
        let mut drive = sim_pid_drive(pid_drive_params());

        assert!(matches!(
            drive.set_target(Pose2D::new(f64::NAN, 0.0, 0.0)),
            Err(DriveError::InvalidTarget(_))
        ));
        assert_eq!(drive.mode(), DriveMode::Idle);
    }

    #[test]
    fn test_proc_holds_pose_on_sensor_fault() {
        let mut drive = sim_pid_drive(pid_drive_params());
        drive.set_target(Pose2D::new(12.0, 0.0, 0.0)).unwrap();

        let input = InputData { dt: DT, yaw: None };
        for _ in 0..10 {
            drive.proc(&input).unwrap();
            drive.write().unwrap();
            drive.hardware_mut().advance(DT);
        }

        let pose = drive.position();
        drive.hardware_mut().set_fail_reads(true);
        let (output, report) = drive.proc(&input).unwrap();

        assert!(report.pose_held);
        assert_eq!(output.pose, pose);
        assert_eq!(output.mode, DriveMode::PositionHold);
    }
}
