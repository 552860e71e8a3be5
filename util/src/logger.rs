//! Logger setup for drive executables
//!
//! All records go to the session log file. Stdout only receives records at or
//! above `stdout_level`, which keeps long simulated runs readable while the
//! file still carries every per-cycle trace.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info};
use std::str::FromStr;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Unrecognised log level \"{0}\", expected one of off/error/warn/info/debug/trace")]
    InvalidLogLevel(String),

    #[error("The stdout level ({stdout:?}) cannot be more verbose than the file level ({file:?})")]
    StdoutMoreVerbose {
        stdout: LevelFilter,
        file: LevelFilter
    },

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// - `file_level` is the most verbose level written to the session log file.
/// - `stdout_level` is the most verbose level echoed to the terminal.
///
/// # Safety
///
/// - This function must only be called once, the global logger can only be
///   set a single time per process.
pub fn logger_init(
    file_level: LevelFilter,
    stdout_level: LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if stdout_level > file_level {
        return Err(LoggerInitError::StdoutMoreVerbose {
            stdout: stdout_level,
            file: file_level
        })
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            // Targets are only useful when digging into debug output
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            }
            else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(file_level)
        .chain(
            fern::Dispatch::new()
                .level(stdout_level)
                .chain(std::io::stdout())
        )
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    File log level: {:?}", file_level);
    info!("    Stdout log level: {:?}", stdout_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

/// Parse a level name given on the command line.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerInitError> {
    LevelFilter::from_str(level)
        .map_err(|_| LoggerInitError::InvalidLogLevel(level.to_string()))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info  => "INF".normal(),
        log::Level::Warn  => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold()
    }
}
