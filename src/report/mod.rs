//! Error reporting surface
//!
//! Files that cannot be classified, and files whose delivery failed, are
//! handed to an [`ErrorReporter`]. The pipeline does not care how reports are
//! surfaced; the binary prints them, tests collect them through a channel.

use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::warn;

use crate::route::Lane;

/// Why a file ended up on the error channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReason {
    /// Extension is not one of the known lanes (may be empty)
    Unclassified { extension: String },
    /// Moving the file into its lane directory failed
    DeliveryFailed { lane: Lane, message: String },
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclassified { extension } if extension.is_empty() => {
                f.write_str("no file extension")
            }
            Self::Unclassified { extension } => write!(f, "unsupported extension '{}'", extension),
            Self::DeliveryFailed { lane, message } => {
                write!(f, "delivery to {} lane failed: {}", lane, message)
            }
        }
    }
}

/// A `(file, reason)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub file: PathBuf,
    pub reason: ErrorReason,
}

impl ErrorReport {
    pub fn unclassified(file: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason: ErrorReason::Unclassified {
                extension: extension.into(),
            },
        }
    }

    pub fn delivery_failed(file: impl Into<PathBuf>, lane: Lane, message: impl fmt::Display) -> Self {
        Self {
            file: file.into(),
            reason: ErrorReason::DeliveryFailed {
                lane,
                message: message.to_string(),
            },
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file.display(), self.reason)
    }
}

/// Sink for error reports
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: &ErrorReport);
}

/// Reports through `tracing` at warn level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, report: &ErrorReport) {
        warn!(file = %report.file.display(), reason = %report.reason, "File routed to error lane");
    }
}

/// Prints `Error: <file> (<reason>)` to stderr unless quiet mode is on
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ErrorReporter for ConsoleReporter {
    fn report(&self, report: &ErrorReport) {
        crate::error_print!("Error: {}", report);
    }
}

/// Forwards reports into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ErrorReport>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ErrorReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ErrorReporter for ChannelReporter {
    fn report(&self, report: &ErrorReport) {
        // Receiver gone means nobody is listening anymore
        let _ = self.tx.send(report.clone());
    }
}
