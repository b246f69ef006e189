use std::path::PathBuf;
use std::time::Duration;

/// Startup and configuration failures. These abort the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Input path is not a directory: {0}")]
    InputNotDirectory(PathBuf),

    #[error("Failed to create input directory {path}: {source}")]
    CreateInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-file delivery failures. The source file stays in the input directory.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Moving {from} timed out after {timeout:?}")]
    Timeout { from: PathBuf, timeout: Duration },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
