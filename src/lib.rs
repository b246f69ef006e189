pub mod config;
pub mod error;
pub mod file;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod route;
pub mod sink;
pub mod watch;

// Re-export commonly used types
pub use config::{Config, ErrorPolicy};
pub use error::{PipelineError, SinkError};
pub use file::FileEvent;
pub use pipeline::{Disposition, Outcome, Pipeline, PipelineStats};
pub use report::{ConsoleReporter, ErrorReport, ErrorReporter, LogReporter};
pub use route::{route, Lane};
