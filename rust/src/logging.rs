//! Verbosity-gated logging for scheduling runs.
//!
//! Every macro compiles to a single integer comparison when the run is silent,
//! so the engine performs no I/O unless a caller raises the verbosity.
//! Levels:
//! - 0: SILENT (nothing)
//! - 1: CHANGES (admissions, releases, clock advances)
//! - 2: CHECKS (per-task consideration and refusal reasons)
//! - 3: DEBUG (ready-set contents and validation internals)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Human-readable name of a verbosity level, used by config `__repr__`.
pub fn verbosity_name(verbosity: u8) -> &'static str {
    match verbosity {
        VERBOSITY_SILENT => "silent",
        VERBOSITY_CHANGES => "changes",
        VERBOSITY_CHECKS => "checks",
        _ => "debug",
    }
}

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: task admissions, completions, clock advances.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            eprintln!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: admission attempts and the reason a task was deferred.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!($($arg)*);
        }
    };
}
