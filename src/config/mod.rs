use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::route::Lane;

/// Pipeline configuration. Static for the life of the process.
///
/// All paths must already be absolute; resolving them against a home
/// directory or the environment is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory watched for incoming files
    pub input_dir: PathBuf,

    /// Output directory for the csv lane
    pub csv_dir: PathBuf,

    /// Output directory for the txt lane
    pub txt_dir: PathBuf,

    /// Delay between poll cycles in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum files admitted per poll cycle
    #[serde(default = "default_max_files_per_poll")]
    pub max_files_per_poll: usize,

    /// Files modified more recently than this are left for a later cycle
    #[serde(default = "default_min_file_age_ms")]
    pub min_file_age_ms: u64,

    /// Upper bound on a single file move
    #[serde(default = "default_move_timeout_ms")]
    pub move_timeout_ms: u64,

    /// Skip dot-files in the input directory
    #[serde(default = "default_ignore_hidden")]
    pub ignore_hidden: bool,

    /// What happens to files that land in the error lane
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

/// Handling of unclassified files after they are reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Leave the file in place; it is reported again every cycle until removed
    #[default]
    Repeat,
    /// Leave the file in place but report it only once while it stays there
    Once,
    /// Move the file into a quarantine directory after reporting it
    Quarantine { dir: PathBuf },
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_files_per_poll() -> usize {
    1
}

fn default_min_file_age_ms() -> u64 {
    500
}

fn default_move_timeout_ms() -> u64 {
    10_000
}

fn default_ignore_hidden() -> bool {
    true
}

impl Config {
    /// Default layout: watch `input`, write lanes to `output/csv` and `output/txt`
    pub fn with_roots(input: impl Into<PathBuf>, output: impl AsRef<Path>) -> Self {
        let output = output.as_ref();

        Self {
            input_dir: input.into(),
            csv_dir: output.join("csv"),
            txt_dir: output.join("txt"),
            poll_interval_ms: default_poll_interval_ms(),
            max_files_per_poll: default_max_files_per_poll(),
            min_file_age_ms: default_min_file_age_ms(),
            move_timeout_ms: default_move_timeout_ms(),
            ignore_hidden: default_ignore_hidden(),
            error_policy: ErrorPolicy::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| PipelineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Output directory bound to a lane. The error lane has none.
    pub fn lane_dir(&self, lane: Lane) -> Option<&Path> {
        match lane {
            Lane::Csv => Some(&self.csv_dir),
            Lane::Txt => Some(&self.txt_dir),
            Lane::Error => None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn min_file_age(&self) -> Duration {
        Duration::from_millis(self.min_file_age_ms)
    }

    pub fn move_timeout(&self) -> Duration {
        Duration::from_millis(self.move_timeout_ms)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let mut dirs = vec![
            ("input_dir", &self.input_dir),
            ("csv_dir", &self.csv_dir),
            ("txt_dir", &self.txt_dir),
        ];
        if let ErrorPolicy::Quarantine { dir } = &self.error_policy {
            dirs.push(("error_policy.dir", dir));
        }

        for (name, dir) in &dirs {
            if !dir.is_absolute() {
                return Err(PipelineError::Config(format!(
                    "{} must be an absolute path, got {}",
                    name,
                    dir.display()
                )));
            }
        }

        for (name, dir) in dirs.iter().skip(1) {
            if *dir == &self.input_dir {
                return Err(PipelineError::Config(format!(
                    "{} must differ from input_dir ({})",
                    name,
                    dir.display()
                )));
            }
        }

        if self.poll_interval_ms == 0 {
            return Err(PipelineError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.max_files_per_poll == 0 {
            return Err(PipelineError::Config("max_files_per_poll must be > 0".into()));
        }
        if self.move_timeout_ms == 0 {
            return Err(PipelineError::Config("move_timeout_ms must be > 0".into()));
        }

        Ok(())
    }
}
