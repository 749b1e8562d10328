//! Logger initialisation
//!
//! Records go to stdout with coloured level tags and to the session log file
//! as plain text. Every record is stamped with the seconds since the session
//! epoch, the clock the control loop runs on, so log lines line up with the
//! state trace saved at the end of a run.
//!
//! Debug and trace records also name the module they came from, with the crate
//! prefix dropped (`pid_drive::state` rather than `auto_lib::pid_drive::state`).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use std::fmt;
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
    #[error("The minimum log level must include `INFO`, found `{0}`")]
    MinLevelTooHigh(LevelFilter),

    #[error("Could not open the session log file: {0}")]
    LogFileError(std::io::Error),

    #[error("A logger has already been installed: {0}")]
    AlreadyInstalled(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `module_levels` overrides `min_level` for individual targets, for example
/// `("auto_lib::pid_ctrl", LevelFilter::Info)` silences the per-cycle
/// controller trace while the rest of the crate logs at `Debug`.
///
/// Only the first call in a process can succeed.
pub fn logger_init(
    min_level: LevelFilter,
    module_levels: &[(&'static str, LevelFilter)],
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::MinLevelTooHigh(min_level));
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileError)?;

    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}{}",
                session::get_elapsed_seconds(),
                colour_tag(record.level()),
                TargetPrefix(record),
                message
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}{}",
                session::get_elapsed_seconds(),
                level_tag(record.level()),
                TargetPrefix(record),
                message
            ))
        })
        .chain(log_file);

    let mut dispatch = fern::Dispatch::new().level(min_level);
    for &(module, level) in module_levels {
        dispatch = dispatch.level_for(module, level);
    }

    dispatch
        .chain(console)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::AlreadyInstalled)?;

    info!(
        "Logging at {:?} from session epoch {}",
        min_level,
        session::get_epoch()
    );
    for (module, level) in module_levels {
        info!("    {} at {:?}", module, level);
    }
    info!("Log file: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Three letter tag for a level.
fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

fn colour_tag(level: Level) -> ColoredString {
    let tag = level_tag(level);
    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info => tag.normal(),
        Level::Warn => tag.yellow(),
        Level::Error => tag.red().bold(),
    }
}

/// Module path of a target without its crate name.
fn short_target(target: &str) -> &str {
    match target.find("::") {
        Some(i) => &target[i + 2..],
        None => target,
    }
}

/// Renders `"<module>: "` for debug and trace records, nothing otherwise.
struct TargetPrefix<'a, 'b>(&'a Record<'b>);

impl fmt::Display for TargetPrefix<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.level() > Level::Info {
            write!(f, "{}: ", short_target(self.0.target()))
        }
        else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_short_target() {
        assert_eq!(short_target("auto_lib::pid_drive::state"), "pid_drive::state");
        assert_eq!(short_target("auto_exec"), "auto_exec");
    }

    #[test]
    fn test_target_prefix_only_below_info() {
        let debug = Record::builder()
            .level(Level::Debug)
            .target("auto_lib::timer")
            .build();
        assert_eq!(TargetPrefix(&debug).to_string(), "timer: ");

        let warn = Record::builder()
            .level(Level::Warn)
            .target("auto_lib::timer")
            .build();
        assert_eq!(TargetPrefix(&warn).to_string(), "");
    }
}
