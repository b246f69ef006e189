//! Console output for the binary and the console reporter
//!
//! A process-wide quiet flag gates everything that is not a result.

use colored::{ColoredString, Colorize};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::route::Lane;

static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Lane name colored for terminal output
pub fn lane_label(lane: Lane) -> ColoredString {
    match lane {
        Lane::Csv => lane.name().bright_green(),
        Lane::Txt => lane.name().bright_cyan(),
        Lane::Error => lane.name().bright_red(),
    }
}

/// `println!` unless quiet
#[macro_export]
macro_rules! status_print {
    ($($arg:tt)*) => {
        if !$crate::output::is_quiet() {
            println!($($arg)*);
        }
    };
}

/// `eprintln!` unless quiet
#[macro_export]
macro_rules! error_print {
    ($($arg:tt)*) => {
        if !$crate::output::is_quiet() {
            eprintln!($($arg)*);
        }
    };
}
