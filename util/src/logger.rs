//! # Logger
//!
//! Records go to stdout with coloured level tags, and to the session log file as plain text.
//! Records logged from a named thread other than `main`, such as a controller's sweep thread,
//! carry the thread name so that concurrent sequences can be told apart.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::{fmt::{self, Write}, thread};

use colored::Colorize;
use log::{info, Level};
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
    #[error("Expected a log level less than `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

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
/// `min_level` must be at least `Info`. The `serialport` target is capped at `Info`, wire traffic
/// on the arm link is logged by `arm_if` at `Trace`.
///
/// Must only be called once.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", format_record(record.level(), record.target(), message, true)))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", format_record(record.level(), record.target(), message, false)))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .level_for("serialport", LevelFilter::Info)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn format_record(level: Level, target: &str, message: &fmt::Arguments, coloured: bool) -> String {
    let current = thread::current();
    let thread_name = current.name().filter(|n| *n != "main");

    format_line(
        session::get_elapsed_seconds(),
        level,
        target,
        thread_name,
        message,
        coloured
    )
}

/// Build one log line.
///
/// The target is only included at debug and trace levels.
fn format_line(
    elapsed_s: f64,
    level: Level,
    target: &str,
    thread_name: Option<&str>,
    message: impl fmt::Display,
    coloured: bool
) -> String {
    let mut line = format!("[{:10.6} {}]", elapsed_s, level_tag(level, coloured));

    // Writing to a String cannot fail
    if let Some(name) = thread_name {
        let _ = write!(line, " ({})", name);
    }
    if level > Level::Info {
        let _ = write!(line, " {}:", target);
    }
    let _ = write!(line, " {}", message);

    line
}

/// Three letter tag for a level, coloured for terminals.
fn level_tag(level: Level, coloured: bool) -> String {
    let tag = match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info  => "INF",
        Level::Warn  => "WRN",
        Level::Error => "ERR"
    };

    if !coloured {
        return tag.to_string();
    }

    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info  => tag.normal(),
        Level::Warn  => tag.yellow(),
        Level::Error => tag.red().bold()
    }.to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plain_lines() {
        let line = format_line(1.5, Level::Warn, "acq_lib::acq_ctrl", None, "partial reply", false);
        assert_eq!(line, "[  1.500000 WRN] partial reply");
        assert!(!line.contains('\u{1b}'));

        let line = format_line(
            2.0,
            Level::Debug,
            "arm_if::link",
            Some("bottle::sweep"),
            "waiting",
            false
        );
        assert_eq!(line, "[  2.000000 DBG] (bottle::sweep) arm_if::link: waiting");
    }

    #[test]
    fn test_coloured_tags() {
        colored::control::set_override(true);

        assert!(level_tag(Level::Error, true).contains('\u{1b}'));
        assert_eq!(level_tag(Level::Error, false), "ERR");
    }
}
