use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

mod settle;

pub use settle::{file_age, is_settled};

/// One filesystem entry discovered during a poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Absolute path of the entry
    pub path: PathBuf,

    /// Base name (last path component)
    pub name: String,

    /// Text after the final `.` of the base name, as written on disk
    pub extension: String,

    /// Only regular files are routed
    pub is_file: bool,

    /// Size in bytes at discovery time
    pub size: u64,

    /// Modification time at discovery time, if the platform reports one
    pub modified: Option<SystemTime>,

    /// When the watcher first saw this entry
    pub discovered_at: DateTime<Utc>,
}

impl FileEvent {
    /// Build an event from a path by reading its metadata
    ///
    /// Symlinks are followed, so a link to a regular file counts as a file.
    /// A dangling link is an error.
    pub fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        Ok(Self::with_metadata(path, &metadata))
    }

    /// Build an event from a path and metadata the caller already holds
    pub fn with_metadata(path: PathBuf, metadata: &std::fs::Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(&name).to_string();

        Self {
            path,
            name,
            extension,
            is_file: metadata.file_type().is_file(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
            discovered_at: Utc::now(),
        }
    }

    /// Whether the base name marks a hidden (dot) file
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Substring after the final `.` of a base name, empty when there is none
///
/// `"x"` and `"x."` both yield `""`; `".csv"` yields `"csv"`.
pub fn extension_of(name: &str) -> &str {
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

/// Entry filter: only regular files go downstream
///
/// Directories and special files are dropped silently. A symlink is judged
/// by its target; the link itself is what the sink later moves.
pub fn is_admissible(event: &FileEvent) -> bool {
    event.is_file
}

/// List the immediate children of `dir`, sorted by name
///
/// The walk does not descend through links, but a symlinked entry reports
/// its target's metadata. Dangling links and entries that vanish between the
/// listing and the metadata read are skipped.
pub fn list_entries(dir: &Path) -> Result<Vec<FileEvent>> {
    // Surface an unreadable root as an error instead of an empty listing
    std::fs::read_dir(dir)?;

    let mut events = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping entry in {}: {}", dir.display(), err);
                continue;
            }
        };

        let metadata = if entry.path_is_symlink() {
            std::fs::metadata(entry.path()).map_err(|err| err.to_string())
        } else {
            entry.metadata().map_err(|err| err.to_string())
        };

        match metadata {
            Ok(metadata) => events.push(FileEvent::with_metadata(entry.into_path(), &metadata)),
            Err(err) => debug!("Skipping {}: {}", entry.path().display(), err),
        }
    }

    Ok(events)
}
