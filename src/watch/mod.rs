//! Polling directory watcher
//!
//! Each call to [`DirectoryWatcher::poll`] lists the input directory once and
//! hands out at most `max_per_poll` new regular files. Files stay "in flight"
//! until the pipeline calls [`DirectoryWatcher::complete`], so a file is never
//! handed out twice while it is being processed.
//!
//! Listed files wait in a FIFO queue. A file released back to the watcher
//! (failed delivery, or a repeat-reported unclassified file) re-enters at the
//! back of that queue, so it cannot starve files that arrived after it.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, trace, warn};

use crate::error::{PipelineError, Result};
use crate::file::{is_admissible, is_settled, list_entries, FileEvent};
use crate::pipeline::Disposition;

pub struct DirectoryWatcher {
    input: PathBuf,
    max_per_poll: usize,
    min_file_age: Duration,
    ignore_hidden: bool,
    report_once: bool,
    queue: VecDeque<FileEvent>,
    queued: HashSet<PathBuf>,
    in_flight: HashSet<PathBuf>,
    /// Reported files kept out of the queue until they leave the directory
    seen: HashSet<PathBuf>,
}

impl DirectoryWatcher {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            max_per_poll: 1,
            min_file_age: Duration::ZERO,
            ignore_hidden: true,
            report_once: false,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            in_flight: HashSet::new(),
            seen: HashSet::new(),
        }
    }

    /// Maximum files handed out per poll (default: 1)
    pub fn max_per_poll(mut self, max: usize) -> Self {
        self.max_per_poll = max.max(1);
        self
    }

    /// Minimum modification age before a file is admitted (default: none)
    pub fn min_file_age(mut self, age: Duration) -> Self {
        self.min_file_age = age;
        self
    }

    /// Skip dot-files (default: true)
    pub fn ignore_hidden(mut self, ignore: bool) -> Self {
        self.ignore_hidden = ignore;
        self
    }

    /// Keep reported files out of later polls while they stay in place
    /// (default: false, they are handed out again every cycle)
    pub fn report_once(mut self, once: bool) -> Self {
        self.report_once = once;
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Files listed but not yet handed out
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Files handed out and not yet completed
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Make sure the input directory exists, creating it if absent
    ///
    /// A path that exists but is not a directory is fatal. Any other error
    /// reading the path is left for the poll loop, which retries every cycle.
    pub fn prepare(&self) -> Result<()> {
        match std::fs::metadata(&self.input) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(PipelineError::InputNotDirectory(self.input.clone())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                std::fs::create_dir_all(&self.input).map_err(|source| {
                    PipelineError::CreateInput {
                        path: self.input.clone(),
                        source,
                    }
                })?;
                info!("Created input directory {}", self.input.display());
                Ok(())
            }
            Err(err) => {
                warn!("Cannot inspect input directory {}: {}", self.input.display(), err);
                Ok(())
            }
        }
    }

    /// Run one poll cycle and return the files admitted in it
    ///
    /// An unreadable directory yields an empty batch; the next cycle retries.
    pub fn poll(&mut self) -> Vec<FileEvent> {
        self.poll_at_most(self.max_per_poll)
    }

    /// Like [`poll`](Self::poll), but admit no more than `limit` files
    ///
    /// The caller uses this to keep the number of in-flight files bounded.
    /// A zero limit still lists the directory so the queue stays current.
    pub fn poll_at_most(&mut self, limit: usize) -> Vec<FileEvent> {
        let entries = match list_entries(&self.input) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Skipping poll of {}: {}", self.input.display(), err);
                return Vec::new();
            }
        };

        let present: HashSet<&Path> = entries.iter().map(|e| e.path.as_path()).collect();
        self.forget_missing(&present);

        let now = SystemTime::now();
        for event in entries {
            if self.ignore_hidden && event.is_hidden() {
                continue;
            }
            if !is_admissible(&event) {
                continue;
            }
            if self.is_known(&event.path) {
                continue;
            }
            if !is_settled(&event, self.min_file_age, now) {
                trace!("Not settled yet: {}", event.path.display());
                continue;
            }

            debug!("Discovered {}", event.path.display());
            self.queued.insert(event.path.clone());
            self.queue.push_back(event);
        }

        let take = self.max_per_poll.min(limit).min(self.queue.len());
        let batch: Vec<FileEvent> = self.queue.drain(..take).collect();
        for event in &batch {
            self.queued.remove(&event.path);
            self.in_flight.insert(event.path.clone());
        }

        batch
    }

    /// Record how a handed-out file was handled
    pub fn complete(&mut self, path: &Path, disposition: &Disposition) {
        if !self.in_flight.remove(path) {
            debug!("Completion for unknown file {}", path.display());
        }

        if self.report_once && matches!(disposition, Disposition::Reported) {
            self.seen.insert(path.to_path_buf());
        }
    }

    fn is_known(&self, path: &Path) -> bool {
        self.queued.contains(path) || self.in_flight.contains(path) || self.seen.contains(path)
    }

    /// Drop tracking for files that are no longer in the directory
    fn forget_missing(&mut self, present: &HashSet<&Path>) {
        self.seen.retain(|p| present.contains(p.as_path()));

        let queued = &mut self.queued;
        self.queue.retain(|event| {
            let keep = present.contains(event.path.as_path());
            if !keep {
                queued.remove(&event.path);
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Lane;
    use std::fs;
    use tempfile::TempDir;

    fn names(batch: &[FileEvent]) -> Vec<&str> {
        batch.iter().map(|e| e.name.as_str()).collect()
    }

    fn moved(to: &Path) -> Disposition {
        Disposition::Moved {
            lane: Lane::Csv,
            to: to.to_path_buf(),
        }
    }

    #[test]
    fn test_prepare_creates_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("Desktop").join("in");

        DirectoryWatcher::new(&input).prepare().unwrap();
        assert!(input.is_dir());
    }

    #[test]
    fn test_prepare_rejects_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        fs::write(&input, "not a dir").unwrap();

        let err = DirectoryWatcher::new(&input).prepare().unwrap_err();
        assert!(matches!(err, PipelineError::InputNotDirectory(_)));
    }

    #[test]
    fn test_one_file_per_poll() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.csv", "b.txt", "c.csv"] {
            fs::write(tmp.path().join(name), name).unwrap();
        }

        let mut watcher = DirectoryWatcher::new(tmp.path());
        for expected in ["a.csv", "b.txt", "c.csv"] {
            let batch = watcher.poll();
            assert_eq!(names(&batch), vec![expected]);
            fs::remove_file(&batch[0].path).unwrap();
            watcher.complete(&batch[0].path, &moved(&batch[0].path));
        }
        assert!(watcher.poll().is_empty());
    }

    #[test]
    fn test_max_per_poll() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.csv", "b.csv", "c.csv"] {
            fs::write(tmp.path().join(name), name).unwrap();
        }

        let mut watcher = DirectoryWatcher::new(tmp.path()).max_per_poll(2);
        assert_eq!(watcher.poll().len(), 2);
        assert_eq!(watcher.poll().len(), 1);
        assert!(watcher.poll().is_empty());
    }

    #[test]
    fn test_poll_at_most_caps_batch() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.csv", "b.csv", "c.csv"] {
            fs::write(tmp.path().join(name), name).unwrap();
        }

        let mut watcher = DirectoryWatcher::new(tmp.path()).max_per_poll(3);
        assert!(watcher.poll_at_most(0).is_empty());
        assert_eq!(watcher.pending(), 3);
        assert_eq!(names(&watcher.poll_at_most(2)), vec!["a.csv", "b.csv"]);
        assert_eq!(watcher.in_flight(), 2);
    }

    #[test]
    fn test_in_flight_not_reemitted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.csv"), "a").unwrap();

        let mut watcher = DirectoryWatcher::new(tmp.path());
        assert_eq!(watcher.poll().len(), 1);
        assert_eq!(watcher.in_flight(), 1);
        assert!(watcher.poll().is_empty());
    }

    #[test]
    fn test_directories_and_hidden_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub.csv")).unwrap();
        fs::write(tmp.path().join(".upload.csv"), "partial").unwrap();

        let mut watcher = DirectoryWatcher::new(tmp.path());
        assert!(watcher.poll().is_empty());

        let mut watcher = DirectoryWatcher::new(tmp.path()).ignore_hidden(false);
        assert_eq!(names(&watcher.poll()), vec![".upload.csv"]);
    }

    #[test]
    fn test_unsettled_file_waits() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.csv"), "a").unwrap();

        let mut watcher = DirectoryWatcher::new(tmp.path()).min_file_age(Duration::from_secs(3600));
        assert!(watcher.poll().is_empty());
        assert_eq!(watcher.pending(), 0);
    }

    #[test]
    fn test_released_file_goes_to_back_of_queue() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("image.png"), "png").unwrap();
        fs::write(tmp.path().join("report.csv"), "csv").unwrap();

        let mut watcher = DirectoryWatcher::new(tmp.path());
        let first = watcher.poll();
        assert_eq!(names(&first), vec!["image.png"]);
        watcher.complete(&first[0].path, &Disposition::Reported);

        let second = watcher.poll();
        assert_eq!(names(&second), vec!["report.csv"]);
        fs::remove_file(&second[0].path).unwrap();
        watcher.complete(&second[0].path, &moved(&second[0].path));

        assert_eq!(names(&watcher.poll()), vec!["image.png"]);
    }

    #[test]
    fn test_report_once_until_removed() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("image.png");
        fs::write(&image, "png").unwrap();

        let mut watcher = DirectoryWatcher::new(tmp.path()).report_once(true);
        let batch = watcher.poll();
        assert_eq!(batch.len(), 1);
        watcher.complete(&image, &Disposition::Reported);
        assert!(watcher.poll().is_empty());

        // Removing the file clears its seen marker
        fs::remove_file(&image).unwrap();
        assert!(watcher.poll().is_empty());
        fs::write(&image, "png again").unwrap();
        assert_eq!(watcher.poll().len(), 1);
    }

    #[test]
    fn test_failed_file_retried() {
        let tmp = TempDir::new().unwrap();
        let report = tmp.path().join("report.csv");
        fs::write(&report, "csv").unwrap();

        let mut watcher = DirectoryWatcher::new(tmp.path()).report_once(true);
        assert_eq!(watcher.poll().len(), 1);
        watcher.complete(&report, &Disposition::Failed);
        assert_eq!(names(&watcher.poll()), vec!["report.csv"]);
    }

    #[test]
    fn test_missing_dir_skips_cycle() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");

        let mut watcher = DirectoryWatcher::new(&input);
        assert!(watcher.poll().is_empty());

        fs::create_dir(&input).unwrap();
        fs::write(input.join("a.txt"), "a").unwrap();
        assert_eq!(watcher.poll().len(), 1);
    }

    #[test]
    fn test_queue_drops_vanished_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.csv"), "a").unwrap();
        fs::write(tmp.path().join("b.csv"), "b").unwrap();

        let mut watcher = DirectoryWatcher::new(tmp.path());
        assert_eq!(names(&watcher.poll()), vec!["a.csv"]);
        assert_eq!(watcher.pending(), 1);

        fs::remove_file(tmp.path().join("b.csv")).unwrap();
        assert!(watcher.poll().is_empty());
        assert_eq!(watcher.pending(), 0);
    }
}
