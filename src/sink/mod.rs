use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

use crate::error::SinkError;
use crate::file::FileEvent;
use crate::route::Lane;

/// Moves files into a lane's output directory
///
/// The directory is created on first use. The base name is preserved and an
/// existing file with the same name is replaced (last write wins).
#[derive(Debug, Clone)]
pub struct DirectorySink {
    lane: Lane,
    dir: PathBuf,
    timeout: Duration,
}

impl DirectorySink {
    pub fn new(lane: Lane, dir: impl Into<PathBuf>) -> Self {
        Self {
            lane,
            dir: dir.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the upper bound on a single move (default: 10s)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Move the event's file into this sink, returning its new path
    pub async fn deliver(&self, event: &FileEvent) -> Result<PathBuf, SinkError> {
        let target = self.dir.join(&event.name);

        match tokio::time::timeout(self.timeout, self.move_into(&event.path, &target)).await {
            Ok(Ok(())) => {
                info!("{} -> {}", event.path.display(), target.display());
                Ok(target)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(SinkError::Timeout {
                from: event.path.clone(),
                timeout: self.timeout,
            }),
        }
    }

    async fn move_into(&self, from: &Path, to: &Path) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SinkError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        move_file(from, to).await.map_err(|source| SinkError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
    }
}

/// Rename `from` to `to`, falling back to copy-then-remove across filesystems
///
/// The fallback is not atomic: a crash between the copy and the remove leaves
/// the file in both places.
pub async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => {
            debug!("Cross-device move, copying {} -> {}", from.display(), to.display());
            fs::copy(from, to).await?;
            fs::remove_file(from).await
        }
        Err(err) => Err(err),
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}
