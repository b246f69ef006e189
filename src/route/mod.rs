use serde::{Deserialize, Serialize};
use std::fmt;

use crate::file::{extension_of, FileEvent};

/// Routing destination for an admitted file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Csv,
    Txt,
    Error,
}

impl Lane {
    /// All lanes, in dispatch order
    pub const ALL: [Lane; 3] = [Lane::Csv, Lane::Txt, Lane::Error];

    /// Classify a base name such as `report.CSV`
    pub fn from_name(name: &str) -> Self {
        Self::from_extension(extension_of(name))
    }

    /// Classify an extension string (case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "csv" => Self::Csv,
            "txt" => Self::Txt,
            _ => Self::Error,
        }
    }

    /// Whether files in this lane are written to an output directory
    pub fn has_output(&self) -> bool {
        !matches!(self, Self::Error)
    }

    /// Get the lane name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Txt => "txt",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Route an event to its lane. Total and side-effect-free.
pub fn route(event: &FileEvent) -> Lane {
    Lane::from_extension(&event.extension)
}
