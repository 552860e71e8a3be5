//! Main drive executable entry point.
//!
//! Runs the full drive stack against the simulated chassis, following one
//! of the paths from the paths parameter file.
//!
//! # Architecture
//!
//! - Initialise session, logging and parameters
//! - Build the drive layers over the simulated chassis
//! - Main loop:
//!     - Path following
//!     - Localisation and closed-loop control
//!     - Motor output
//!     - Simulation step
//!     - Archiving
//! - Save the final controller state and shut down

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use drive_lib::{
    data_store::DataStore,
    params::DriveParams,
    paths::{PathStatus, PathsFile},
    pid_drive::{InputData, PidDrive},
    sim::SimChassis,
    simple_drive::SimpleDrive,
    vec_drive::VectorDrive
};
use util::{
    archive::Archived,
    logger::{logger_init, parse_level, LevelFilter},
    module::State,
    session::Session
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Vector drive path following simulation")]
struct Opt {
    /// Drive parameter file. Defaults to `params/drive.toml` under the
    /// software root.
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Paths parameter file. Defaults to `params/paths.toml` under the
    /// software root.
    #[structopt(long, parse(from_os_str))]
    paths: Option<PathBuf>,

    /// Name of the path to follow.
    #[structopt(long, default_value = "start_to_slam_sw90")]
    path: String,

    /// Stop after this many cycles even if the path is not finished.
    #[structopt(long, default_value = "3000")]
    max_cycles: u64,

    /// Sleep between cycles so the simulation runs in real time.
    #[structopt(long)]
    realtime: bool,

    /// Feed the simulated yaw to localisation as a gyro.
    #[structopt(long)]
    gyro: bool,

    /// Log level printed to stdout. The log file always records everything.
    #[structopt(long, default_value = "info")]
    log_level: String,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("drive_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    let stdout_level = parse_level(&opt.log_level)
        .wrap_err("Invalid log level")?;
    logger_init(LevelFilter::Trace, stdout_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Vector Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let drive_params = match opt.params {
        Some(ref p) => util::params::load_path::<DriveParams, _>(p),
        None => util::params::load::<DriveParams>("drive.toml")
    }.wrap_err("Could not load drive params")?;

    let paths_file = match opt.paths {
        Some(ref p) => util::params::load_path::<PathsFile, _>(p),
        None => util::params::load::<PathsFile>("paths.toml")
    }.wrap_err("Could not load paths")?;

    let mut follower = paths_file.follower(&opt.path)
        .wrap_err_with(|| format!("Could not load path \"{}\"", opt.path))?;

    info!("Parameters loaded");

    // ---- INITIALISE DRIVE ----

    let chassis = SimChassis::new(&drive_params.motors, &drive_params.constants)
        .wrap_err("Failed to build the simulated chassis")?;
    let simple = SimpleDrive::new(
        chassis, 
        drive_params.motors.clone(), 
        drive_params.constants.clone()
    ).wrap_err("Failed to build the drive")?;
    let mut drive = PidDrive::new(VectorDrive::new(simple), drive_params.pid.clone())
        .wrap_err("Failed to build the PID drive")?;

    drive.begin().wrap_err("Failed to start the drive")?;

    // Start the robot sitting on the first waypoint
    if let Some(start) = follower.current_target() {
        drive.set_position(start);
        drive.hardware_mut().set_true_pose(start);
        info!("Starting at {}", start);
    }

    let mut ds = DataStore::with_archive(&session)
        .wrap_err("Failed to create the cycle archive")?;

    info!("Following path \"{}\"\n", opt.path);

    // ---- MAIN LOOP ----

    while ds.num_cycles < opt.max_cycles {
        let cycle_start_instant = Instant::now();

        ds.cycle_start();

        // ---- PATH FOLLOWING ----

        let path_status = follower.proc(&mut drive)
            .wrap_err("Path following failed")?;
        ds.path_status = Some(path_status);

        if path_status == PathStatus::Finished {
            info!("Path finished after {:.02} s", ds.sim_time_s);
            break;
        }

        // ---- CONTROL ----

        let input = InputData {
            dt: CYCLE_PERIOD_S,
            yaw: match opt.gyro {
                true => Some(drive.hardware().yaw()),
                false => None
            }
        };

        let (output, report) = drive.proc(&input)
            .wrap_err("Drive processing failed")?;
        ds.output = Some(output);
        ds.report = report;

        drive.write().wrap_err("Failed to write motor demands")?;

        // ---- SIMULATION ----

        let chassis = drive.hardware_mut();
        chassis.advance(CYCLE_PERIOD_S);
        ds.motor_duty = chassis.duty().to_vec();
        ds.true_pose = Some(chassis.true_pose());

        // ---- ARCHIVE ----

        if let Err(e) = ds.write() {
            warn!("Could not archive cycle data: {}", e);
        }

        ds.cycle_end(CYCLE_PERIOD_S);

        // ---- CYCLE MANAGEMENT ----

        if !opt.realtime {
            continue;
        }

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s", 
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }
    }

    if ds.num_cycles >= opt.max_cycles {
        warn!(
            "Cycle limit reached at waypoint {:?} of path \"{}\"", 
            ds.path_status, 
            opt.path
        );
    }

    // ---- SHUTDOWN ----

    drive.clear_target();
    drive.step(CYCLE_PERIOD_S).wrap_err("Failed to stop the drive")?;
    drive.write().wrap_err("Failed to write motor demands")?;

    let true_pose = drive.hardware().true_pose();
    info!("Final pose: {} (true {})", drive.position(), true_pose);

    session.save("drive/final_state.json", drive.snapshot());

    info!("End of execution");
    session.exit();

    Ok(())
}
